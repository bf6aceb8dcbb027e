use eframe::egui;

use crate::config::DashboardConfig;
use crate::state::AppState;
use crate::ui::{charts, panels, preview};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct UpiDashboardApp {
    pub state: AppState,
}

impl UpiDashboardApp {
    /// Build the app and try the fallback dataset once at startup.
    pub fn new(config: DashboardConfig) -> Self {
        let mut state = AppState::new(config);
        state.load_fallback();
        Self { state }
    }
}

impl eframe::App for UpiDashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: upload + filters ----
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: metrics, charts, preview ----
        let mut download = false;
        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(filtered) = self.state.filtered.as_ref() else {
                ui.centered_and_justified(|ui| {
                    ui.heading(
                        "No data found. Upload a UPI transactions file (File → Open…) \
                         or place it at the configured fallback path.",
                    );
                });
                return;
            };

            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.heading("UPI Transaction Analysis Dashboard");
                    ui.add_space(6.0);
                    preview::metrics_row(ui, filtered);
                    ui.separator();
                    charts::visualizations(ui, filtered, &self.state.scatter, &self.state.config);
                    ui.separator();
                    download = preview::data_preview(ui, filtered, &self.state.preview);
                });
        });

        if download {
            panels::save_file_dialog(&mut self.state);
        }
    }
}

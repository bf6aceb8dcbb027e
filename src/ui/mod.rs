//! egui rendering: sidebar and top bar, charts, metrics and preview.

pub mod charts;
pub mod panels;
pub mod preview;

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveTime};
use parquet::arrow::ArrowWriter;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const ROWS: usize = 5_000;

const CITIES: &[&str] = &[
    "Mumbai", "Delhi", "Bengaluru", "Hyderabad", "Chennai", "Pune", "Kolkata", "Ahmedabad",
    "Jaipur", "Lucknow",
];
const PAYMENT_METHODS: &[&str] = &["UPI", "Debit Card", "Credit Card", "Net Banking", "Wallet"];
const STATUSES: &[(&str, f64)] = &[("SUCCESS", 0.88), ("FAILED", 0.08), ("PENDING", 0.04)];
const MERCHANTS: &[&str] = &[
    "Swiggy", "Zomato", "Amazon", "Flipkart", "BigBasket", "Myntra", "Uber", "Ola", "IRCTC",
    "BookMyShow", "PhonePe Recharge", "Reliance Fresh", "DMart", "Nykaa", "MakeMyTrip",
];
const TRANSACTION_TYPES: &[&str] = &["P2M", "P2P", "Bill Payment", "Recharge"];
const BANKS: &[&str] = &["SBI", "HDFC", "ICICI", "Axis", "Kotak", "PNB", "Bank of Baroda"];

/// One synthetic transaction, already rendered the way a messy export would
/// carry it (text dates and times, occasional junk amounts).
struct Row {
    id: i64,
    date: String,
    time: String,
    amount: String,
    city: String,
    payment_method: String,
    status: String,
    merchant: String,
    transaction_type: String,
    bank: String,
    remaining_balance: f64,
    customer_age: i64,
}

fn pick_weighted<'a>(rng: &mut StdRng, options: &[(&'a str, f64)]) -> &'a str {
    let mut roll: f64 = rng.gen();
    for (name, weight) in options {
        if roll < *weight {
            return name;
        }
        roll -= weight;
    }
    options[options.len() - 1].0
}

fn generate_rows(rng: &mut StdRng) -> Result<Vec<Row>> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;

    (0..ROWS)
        .map(|i| {
            let date = start + Duration::days(rng.gen_range(0..366));
            // Busy around lunch and evening.
            let hour = match rng.gen_range(0..10) {
                0..=2 => rng.gen_range(12..15),
                3..=5 => rng.gen_range(18..23),
                _ => rng.gen_range(0..24),
            };
            let time = NaiveTime::from_hms_opt(hour, rng.gen_range(0..60), rng.gen_range(0..60))
                .context("invalid time of day")?;

            let amount: f64 = (rng.gen_range(1.0f64..9.0).powi(4) + 10.0).round();
            let amount = match rng.gen_range(0..200) {
                0 => "N/A".to_string(),
                1 => String::new(),
                _ => format!("{amount:.2}"),
            };

            Ok(Row {
                id: i as i64 + 1,
                date: date.format("%Y-%m-%d").to_string(),
                time: time.format("%H:%M:%S").to_string(),
                amount,
                city: CITIES.choose(rng).copied().unwrap_or("Mumbai").to_string(),
                payment_method: PAYMENT_METHODS.choose(rng).copied().unwrap_or("UPI").to_string(),
                status: pick_weighted(rng, STATUSES).to_string(),
                merchant: MERCHANTS.choose(rng).copied().unwrap_or("Amazon").to_string(),
                transaction_type: TRANSACTION_TYPES.choose(rng).copied().unwrap_or("P2M").to_string(),
                bank: BANKS.choose(rng).copied().unwrap_or("SBI").to_string(),
                remaining_balance: (rng.gen_range(0.0..150_000.0f64) * 100.0).round() / 100.0,
                customer_age: rng.gen_range(18..75),
            })
        })
        .collect()
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    // Padded headers, as spreadsheet exports often have.
    writer.write_record([
        "TransactionID",
        " TransactionDate",
        "TransactionTime",
        "Amount ",
        "City",
        "PaymentMethod",
        "Status",
        "MerchantName",
        "TransactionType",
        "BankNameSent",
        "RemainingBalance",
        "CustomerAge",
    ])?;
    for r in rows {
        writer.write_record([
            r.id.to_string(),
            r.date.clone(),
            r.time.clone(),
            r.amount.clone(),
            r.city.clone(),
            r.payment_method.clone(),
            r.status.clone(),
            r.merchant.clone(),
            r.transaction_type.clone(),
            r.bank.clone(),
            r.remaining_balance.to_string(),
            r.customer_age.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(rows: &[Row], path: &str) -> Result<()> {
    fn text(rows: &[Row], get: impl Fn(&Row) -> &str) -> ArrayRef {
        Arc::new(StringArray::from(rows.iter().map(get).collect::<Vec<_>>()))
    }

    let amounts: Vec<Option<f64>> = rows.iter().map(|r| r.amount.parse().ok()).collect();

    let schema = Arc::new(Schema::new(vec![
        Field::new("TransactionID", DataType::Int64, false),
        Field::new("TransactionDate", DataType::Utf8, false),
        Field::new("TransactionTime", DataType::Utf8, false),
        Field::new("Amount", DataType::Float64, true),
        Field::new("City", DataType::Utf8, false),
        Field::new("PaymentMethod", DataType::Utf8, false),
        Field::new("Status", DataType::Utf8, false),
        Field::new("MerchantName", DataType::Utf8, false),
        Field::new("TransactionType", DataType::Utf8, false),
        Field::new("BankNameSent", DataType::Utf8, false),
        Field::new("RemainingBalance", DataType::Float64, false),
        Field::new("CustomerAge", DataType::Int64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(rows.iter().map(|r| r.id).collect::<Vec<_>>())),
        text(rows, |r| &r.date),
        text(rows, |r| &r.time),
        Arc::new(Float64Array::from(amounts)),
        text(rows, |r| &r.city),
        text(rows, |r| &r.payment_method),
        text(rows, |r| &r.status),
        text(rows, |r| &r.merchant),
        text(rows, |r| &r.transaction_type),
        text(rows, |r| &r.bank),
        Arc::new(Float64Array::from(
            rows.iter().map(|r| r.remaining_balance).collect::<Vec<_>>(),
        )),
        Arc::new(Int64Array::from(
            rows.iter().map(|r| r.customer_age).collect::<Vec<_>>(),
        )),
    ];

    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;
    let file = std::fs::File::create(path).with_context(|| format!("creating {path}"))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let parquet = std::env::args().any(|a| a == "--parquet");
    let mut rng = StdRng::seed_from_u64(42);
    let rows = generate_rows(&mut rng)?;

    let csv_path = "filtered_upi_transactions.csv";
    write_csv(&rows, csv_path)?;
    println!("Wrote {} transactions to {csv_path}", rows.len());

    if parquet {
        let parquet_path = "upi_transactions.parquet";
        write_parquet(&rows, parquet_path)?;
        println!("Wrote {} transactions to {parquet_path}", rows.len());
    }
    Ok(())
}

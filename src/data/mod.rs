/// Data layer: loading, normalization, filtering, aggregation and export.
///
/// Architecture:
/// ```text
///  .xlsx / .csv / .parquet / .json
///        │
///        ▼
///   ┌──────────┐     ┌───────────┐
///   │  loader   │◄────│   cache    │  input identity → outcome
///   └──────────┘     └───────────┘
///        │  TransactionTable (raw)
///        ▼
///   ┌───────────┐
///   │ normalize  │  trim names, coerce dates/times/amounts → Capabilities
///   └───────────┘
///        │  NormalizedTable
///        ▼
///   ┌──────────┐
///   │  filter   │  options, defaults, criteria → filtered rows
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐   ┌──────────┐
///   │ aggregate  │   │  export   │  metrics / charts, CSV + preview
///   └───────────┘   └──────────┘
/// ```

pub mod aggregate;
pub mod cache;
pub mod export;
pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;

pub mod series;
pub mod series_cache;
pub mod source;

// Re-export the core series types (e.g. `use crate::market_data::PriceSeries`).
pub use series::{LookbackWindow, PriceBar, PriceSeries};
pub use source::{CachedSource, SeriesSource};

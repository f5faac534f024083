pub mod pipeline;
pub mod table;

pub use pipeline::{build_chart, resolve_window, BenchmarkTrend, ChartPayload, ChartRequest};
pub use table::{IndicatorKind, INDICATOR_TABLE};

// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free implementations of the indicators shown on the
// dashboard.  Every function takes an immutable slice of closes and returns a
// freshly allocated result.  Insufficient data never fails: it maps to an
// empty trend, `None` bands, or `None` entries in an aligned series.

pub mod dispersion;
pub mod rsi;
pub mod sma;
pub mod trend;

pub use dispersion::{calculate_bands, DispersionBands};
pub use trend::{fit_trend, fit_window, TrendResult, MIN_TREND_BARS};

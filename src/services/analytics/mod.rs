pub mod charts;
pub mod inference;
pub mod palette;
pub mod presentation;
pub mod stats;
pub mod suggest;
pub mod types;
pub mod utils;

pub use charts::build_chart;
pub use inference::infer_types;
pub use stats::compute_stats;
pub use suggest::suggest_charts;

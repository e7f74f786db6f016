//! Training metrics and logging.
//!
//! - [`StepRecord`] / [`EpochSummary`]: what the subtrainers report
//! - [`LogLogger`]: output through the `log` facade
//! - [`CSVLogger`]: CSV file logging for analysis
//! - [`MultiLogger`]: Combine multiple loggers

pub mod logger;

pub use logger::{CSVLogger, EpochSummary, LogLogger, MetricsLogger, MultiLogger, StepRecord};

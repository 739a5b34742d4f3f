pub mod config;
pub mod report;
pub mod sequence;
pub mod verdict;

pub use config::{Config, LoggingConfig, ReductionConfig, UnitKind};
pub use report::{ReductionReport, ReductionStats};
pub use sequence::{Span, Unit, UnitSequence};
pub use verdict::Verdict;

pub mod activity;
pub mod activity_validation;
pub mod calculations;
pub mod config;
pub mod constraint;
pub mod error;
pub mod export;
pub mod graph;
pub mod persistence;
pub mod schedule;
pub mod windows;

pub use activity::{Activity, DurationSpec};
pub use activity_validation::ActivityValidationError;
pub use calculations::{Alignment, AnchorState, WindowAligner};
pub use config::ScheduleConfig;
pub use constraint::{ConstraintSpec, LimitKind, TideWindow, WeatherLimit};
pub use error::{ScheduleError, ScheduleResult};
pub use export::ScheduleRow;
pub use graph::ActivityGraph;
pub use schedule::{
    AnchorSweepOutcome, RelativeTiming, Schedule, ScheduleSummary, ScheduleWarning,
};
pub use windows::{
    EnvironmentalWindows, TimeWindow, WeatherSample, WeatherSeries, WindowCategory,
    WindowConfig, WindowProvider,
};

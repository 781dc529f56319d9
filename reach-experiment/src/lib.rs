pub mod config;
pub mod error;
pub mod experiment;
pub mod log;
pub mod session;
pub mod trial;
pub use config::SessionConfig;
pub use error::{ConfigError, Result, SessionError};
pub use experiment::{BlockConfig, BlockSummary, Experiment, ExperimentConfig};
pub use log::{read_log, LogRecord, TrialLog, HEADER};
pub use session::{SessionEvent, TrialSession};
pub use trial::{TrialOutcome, TrialResult};

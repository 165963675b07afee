pub mod config;
pub mod error;
pub mod task_log;
pub mod traits;

pub use config::AppConfig;
pub use error::{FlowloadError, Result};
pub use task_log::{TaskLog, TaskLogEntry};
pub use traits::{ProcessEngine, Variables};

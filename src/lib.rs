pub mod collector;
pub mod error;
pub mod logging;
pub mod report;
pub mod retry;
pub mod ssh;

pub use collector::{collect, remote_command, CollectOptions};
pub use error::{CollectError, ReportError};
pub use report::{parse_report, render_table, write_table_report, ChecksumRecord};
pub use retry::{run_with_retry, uniform_backoff, RetryOutcome};

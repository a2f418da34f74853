// Worker process management
pub mod environment;
pub mod locator;
pub mod protocol;
pub mod signal;
pub mod supervisor;

pub use environment::ToolEnvironment;
pub use locator::{worker_file_name, WorkerLocator, WORKER_NAME};
pub use protocol::{parse_line, ParsedLine, WorkerMessage};
pub use supervisor::{CompletionEvent, Supervisor, SupervisorEvent, SupervisorState, LOG_TAIL_LINES};

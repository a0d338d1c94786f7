pub mod fixtures;
pub mod test_server;

pub use fixtures::{init_logger, object, wait_for_state};
pub use recorder::{recorder, EventRecorder, RecordedEvents};
pub use test_server::{ServerScript, ServiceHandler, TestServer};

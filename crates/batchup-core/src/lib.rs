pub mod config;
pub mod logging;

pub mod queue;
pub mod scheduler;
pub mod speed;
pub mod transport;

pub use queue::{FileSource, ItemId, UploadStatus};
pub use scheduler::UploadScheduler;
pub use transport::{CurlTransport, Transport};

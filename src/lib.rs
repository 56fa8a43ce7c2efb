// Library exports for the binary and integration tests

pub mod cli;
pub mod config;
pub mod consul;
pub mod detector;
pub mod error;
pub mod hashing;
pub mod logging;
pub mod shutdown;
pub mod sync;

pub use config::{KvTarget, SyncConfig, WatchTarget};
pub use consul::{ConsulClient, Publish};
pub use detector::{ChangeDetector, FileSnapshot, PollOutcome};
pub use error::SyncError;

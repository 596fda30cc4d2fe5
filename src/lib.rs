pub mod record;
pub mod partition;
pub mod sink;
pub mod local;
pub mod s3;
pub mod noop_sink;
pub mod backend;

pub mod accumulator;
pub mod scheduler;
pub mod engine;

pub mod error;
pub mod env;
pub mod config;
pub mod init;
pub mod server;

pub use engine::{BatchEngine, EngineConfig, EngineStats, FlushOutcome, RetryPolicy};
pub use error::EngineError;
pub use record::Record;
pub use sink::StorageSink;

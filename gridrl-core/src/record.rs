//! Types and traits for recording training metrics.
//!
//! A [`Record`] is a set of named values produced by agents, the trainer and the
//! evaluator. Recorders decide what happens to them: [`LogRecorder`] aggregates
//! stored records and writes them through the `log` facade, [`BufferedRecorder`]
//! keeps them in memory and [`NullRecorder`] drops them.
//!
//! ```rust
//! use gridrl_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("episode", RecordValue::Scalar(1.0));
//! record.insert("episode_return", RecordValue::Scalar(-0.3));
//! assert_eq!(record.get_scalar("episode_return").unwrap(), -0.3);
//! ```
mod base;
mod buffered_recorder;
mod log_recorder;
mod null_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use log_recorder::LogRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::{AggregateRecorder, Recorder};
pub use storage::RecordStorage;

//! Trajectory data: replay log decoding, per-entity history building, sampling.
//!
//! # Invariants
//! - Samples of a history are strictly increasing in time.
//! - Consecutive stored angles differ by at most π on every channel.
//! - A load either yields a complete history set or fails; never a partial one.

pub mod history;
pub mod load;
pub mod log;
pub mod sample;

pub use history::{EntityHistory, HistoryBuilder, HistorySet, ReferenceError};
pub use load::{LoadError, load_histories};
pub use log::{Event, LogError, parse_log, read_log};
pub use sample::{Sample, sample};

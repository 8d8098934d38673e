//! Developer tooling: read-only inspection of loaded histories and of the
//! entities a replay has materialized.

pub mod inspector;

pub use inspector::{EntityInfo, HistoryInfo, HistorySummary, ReplayInspector, WorldSummary};

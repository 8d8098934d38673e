use replay_geodesy::Geodesy;
use std::path::Path;

use crate::history::{HistoryBuilder, HistorySet, ReferenceError};
use crate::log::{LogError, read_log};

/// Reasons a replay log could not be turned into histories.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("could not find replay file: {0}")]
    NotFound(String),
    #[error(transparent)]
    Log(#[from] LogError),
    #[error("inconsistent replay log: {0}")]
    Reference(#[from] ReferenceError),
}

/// Read, decode and build histories from a log file.
///
/// The load is all-or-nothing: any malformed row or lifecycle violation fails
/// the whole load and no partial history set is returned.
pub fn load_histories(path: &Path, geodesy: impl Geodesy) -> Result<HistorySet, LoadError> {
    let _span = tracing::info_span!("load_histories", path = %path.display()).entered();
    let events = read_log(path)?;
    let histories = HistoryBuilder::build(geodesy, &events)?;
    tracing::info!(
        events = events.len(),
        entities = histories.len(),
        samples = histories.sample_count(),
        "replay log loaded"
    );
    Ok(histories)
}

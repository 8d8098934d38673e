//! Tabular replay log decoding.
//!
//! ```text
//! # comment lines and trailing `# ...` are ignored
//! time, entity_id, event, arg1, arg2, arg3, arg4, arg5, arg6
//! 0.0, 1, create_entity, Aircraft, Alpha
//! 0.0, 1, update_entity_state, 51.5, -0.12, 1000, 0, 2.5, 90
//! 60.0, 1, destroy_entity
//! ```
//!
//! Columns are located by header name. Fields may be wrapped in double quotes
//! to carry commas. Every row is turned into a typed [`Event`] here; nothing
//! downstream sees raw fields.

use replay_common::EntityId;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A decoded replay log row. Angles in degrees, altitude in metres, as recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    CreateEntity {
        time: f64,
        entity_id: EntityId,
        template_name: String,
        display_name: String,
    },
    DestroyEntity {
        time: f64,
        entity_id: EntityId,
    },
    #[serde(rename = "update_entity_state")]
    UpdateState {
        time: f64,
        entity_id: EntityId,
        latitude: f64,
        longitude: f64,
        altitude: f64,
        roll: f64,
        pitch: f64,
        yaw: f64,
    },
}

impl Event {
    pub fn time(&self) -> f64 {
        match self {
            Self::CreateEntity { time, .. }
            | Self::DestroyEntity { time, .. }
            | Self::UpdateState { time, .. } => *time,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        match self {
            Self::CreateEntity { entity_id, .. }
            | Self::DestroyEntity { entity_id, .. }
            | Self::UpdateState { entity_id, .. } => *entity_id,
        }
    }

    /// The event kind as written in the log.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateEntity { .. } => "create_entity",
            Self::DestroyEntity { .. } => "destroy_entity",
            Self::UpdateState { .. } => "update_entity_state",
        }
    }
}

/// Errors from decoding a replay log. Line numbers are 1-based.
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("log has no header row")]
    MissingHeader,
    #[error("header is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("line {line}: missing value for column '{column}'")]
    MissingField { line: usize, column: String },
    #[error("line {line}: column '{column}' is not a finite number: '{value}'")]
    InvalidNumber {
        line: usize,
        column: String,
        value: String,
    },
    #[error("line {line}: invalid entity id '{value}'")]
    InvalidEntityId { line: usize, value: String },
    #[error("line {line}: unknown event kind '{kind}'")]
    UnknownEvent { line: usize, kind: String },
    #[error("line {line}: unterminated quoted field")]
    UnterminatedQuote { line: usize },
}

const ARG_COLUMNS: [&str; 6] = ["arg1", "arg2", "arg3", "arg4", "arg5", "arg6"];

/// Column positions resolved from the header row.
struct Columns {
    time: usize,
    entity_id: usize,
    event: usize,
    args: [Option<usize>; 6],
}

impl Columns {
    fn from_header(fields: &[String]) -> Result<Self, LogError> {
        let find = |name: &str| fields.iter().position(|f| f == name);
        let required = |name: &'static str| find(name).ok_or(LogError::MissingColumn(name));
        Ok(Self {
            time: required("time")?,
            entity_id: required("entity_id")?,
            event: required("event")?,
            args: ARG_COLUMNS.map(find),
        })
    }
}

/// One data row with its columns resolved.
struct Row<'a> {
    line: usize,
    fields: &'a [String],
    columns: &'a Columns,
}

impl Row<'_> {
    fn field(&self, index: Option<usize>, column: &str) -> Result<&str, LogError> {
        index
            .and_then(|i| self.fields.get(i))
            .map(String::as_str)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| LogError::MissingField {
                line: self.line,
                column: column.to_string(),
            })
    }

    fn number(&self, index: Option<usize>, column: &str) -> Result<f64, LogError> {
        let raw = self.field(index, column)?;
        raw.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| LogError::InvalidNumber {
                line: self.line,
                column: column.to_string(),
                value: raw.to_string(),
            })
    }

    fn arg(&self, n: usize) -> Result<&str, LogError> {
        self.field(self.columns.args[n - 1], ARG_COLUMNS[n - 1])
    }

    fn arg_number(&self, n: usize) -> Result<f64, LogError> {
        self.number(self.columns.args[n - 1], ARG_COLUMNS[n - 1])
    }

    fn decode(&self) -> Result<Event, LogError> {
        let time = self.number(Some(self.columns.time), "time")?;
        let raw_id = self.field(Some(self.columns.entity_id), "entity_id")?;
        let entity_id = raw_id
            .parse::<i64>()
            .map(EntityId)
            .map_err(|_| LogError::InvalidEntityId {
                line: self.line,
                value: raw_id.to_string(),
            })?;

        match self.field(Some(self.columns.event), "event")? {
            "create_entity" => Ok(Event::CreateEntity {
                time,
                entity_id,
                template_name: self.arg(1)?.to_string(),
                display_name: self.arg(2)?.to_string(),
            }),
            "destroy_entity" => Ok(Event::DestroyEntity { time, entity_id }),
            "update_entity_state" => Ok(Event::UpdateState {
                time,
                entity_id,
                latitude: self.arg_number(1)?,
                longitude: self.arg_number(2)?,
                altitude: self.arg_number(3)?,
                roll: self.arg_number(4)?,
                pitch: self.arg_number(5)?,
                yaw: self.arg_number(6)?,
            }),
            other => Err(LogError::UnknownEvent {
                line: self.line,
                kind: other.to_string(),
            }),
        }
    }
}

/// Split a line on commas, honouring double quotes, and trim each field.
fn split_fields(line: &str, line_number: usize) -> Result<Vec<String>, LogError> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    if quoted {
        return Err(LogError::UnterminatedQuote { line: line_number });
    }
    fields.push(current.trim().to_string());
    Ok(fields)
}

/// Strip a `#` comment, unless the `#` sits inside a quoted field.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

/// Decode every row of a replay log. Fails on the first malformed row.
pub fn parse_log(text: &str) -> Result<Vec<Event>, LogError> {
    let mut columns: Option<Columns> = None;
    let mut events = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = strip_comment(raw).trim();
        if content.is_empty() {
            continue;
        }
        let fields = split_fields(content, line)?;
        match &columns {
            None => columns = Some(Columns::from_header(&fields)?),
            Some(columns) => {
                let row = Row {
                    line,
                    fields: &fields,
                    columns,
                };
                events.push(row.decode()?);
            }
        }
    }

    if columns.is_none() {
        return Err(LogError::MissingHeader);
    }
    tracing::trace!(events = events.len(), "decoded replay log");
    Ok(events)
}

/// Read and decode a replay log from disk.
pub fn read_log(path: impl AsRef<Path>) -> Result<Vec<Event>, LogError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_log(&text)
}

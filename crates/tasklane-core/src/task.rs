use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Persisted record shape: `{"text": ..., "id": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub text: String,
    pub id: TaskId,
}

impl Task {
    pub fn new(text: impl Into<String>, id: TaskId) -> Self {
        Self {
            text: text.into(),
            id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Active,
    Completed,
    Trash,
}

impl ListKind {
    pub const ALL: [ListKind; 3] = [ListKind::Active, ListKind::Completed, ListKind::Trash];

    pub fn storage_key(self) -> &'static str {
        match self {
            ListKind::Active => "todos",
            ListKind::Completed => "completed",
            ListKind::Trash => "trash",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ListKind::Active => "Todos",
            ListKind::Completed => "Completed",
            ListKind::Trash => "Trash",
        }
    }

    pub fn empty_message(self) -> String {
        format!("No tasks in {}.", self.label())
    }
}

impl fmt::Display for ListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ListKind::Active => "active",
            ListKind::Completed => "completed",
            ListKind::Trash => "trash",
        };
        f.write_str(name)
    }
}

impl FromStr for ListKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "todos" | "todo" => Ok(ListKind::Active),
            "completed" | "done" => Ok(ListKind::Completed),
            "trash" => Ok(ListKind::Trash),
            other => Err(anyhow!("unknown list: {other}")),
        }
    }
}

/// Trims the input and flattens line breaks to spaces. Returns `None` when
/// nothing is left.
pub fn normalize_text(raw: &str) -> Option<String> {
    let flattened: String = raw
        .trim()
        .chars()
        .map(|ch| if ch == '\r' || ch == '\n' { ' ' } else { ch })
        .collect();

    if flattened.is_empty() {
        None
    } else {
        Some(flattened)
    }
}

//! Type definitions for the GitHub entities the engine reads.
//!
//! These are transient per-event views; nothing here is cached between events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::parent::ParentKind;
use crate::taxonomy::same_name;

/// Repository an event belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repo {
    /// Owner login
    pub owner: String,
    /// Repository name
    pub name: String,
    /// GraphQL node id, needed as the owner of cloned boards
    pub node_id: Option<String>,
}

impl Repo {
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            node_id: None,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Issue or repository label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label ID
    #[serde(default)]
    pub id: u64,
    /// Label name
    pub name: String,
}

/// Project board state. REST reports lowercase, GraphQL uppercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardState {
    #[serde(alias = "OPEN")]
    Open,
    #[serde(alias = "CLOSED")]
    Closed,
}

/// A classic project board.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Board {
    /// Database ID
    pub id: u64,
    /// GraphQL node ID
    pub node_id: String,
    /// Board name
    pub name: String,
    /// Board state
    pub state: BoardState,
}

impl Board {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == BoardState::Open
    }

    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}

/// Column of a project board.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Column {
    /// Database ID
    pub id: u64,
    /// GraphQL node ID
    pub node_id: String,
    /// Column name
    pub name: String,
}

impl Column {
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        same_name(&self.name, name)
    }
}

/// A card belonging to a parent object, with the board and columns it lives in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentCard {
    /// Database ID
    pub id: u64,
    /// GraphQL node ID
    pub node_id: String,
    /// Archived cards are not considered open
    pub archived: bool,
    /// Column the card sits in, absent for cards awaiting triage
    pub column: Option<Column>,
    /// Board the card belongs to
    pub board: Board,
    /// Every column of that board, in board order
    pub board_columns: Vec<Column>,
}

impl ParentCard {
    /// Not archived, on an open board.
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.archived && self.board.is_open()
    }

    #[must_use]
    pub fn in_column(&self, name: &str) -> bool {
        self.column.as_ref().is_some_and(|column| column.is_named(name))
    }
}

/// Milestone state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneState {
    Open,
    Closed,
}

/// Repository milestone.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Milestone {
    /// Milestone number
    pub number: u64,
    /// Milestone title
    pub title: String,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Due date
    #[serde(default)]
    pub due_on: Option<DateTime<Utc>>,
    /// State
    pub state: MilestoneState,
    /// Number of open issues and pull requests assigned
    #[serde(default)]
    pub open_issues: u64,
}

impl Milestone {
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state == MilestoneState::Closed
    }

    /// Body for the board mirroring this milestone.
    #[must_use]
    pub fn board_body(&self) -> String {
        let description = self.description.as_deref().unwrap_or_default();
        match self.due_on {
            Some(due) => format!("{description}\nDue on: {}", due.format("%Y-%m-%d")),
            None => description.to_string(),
        }
    }
}

/// An issue or pull request assigned to a milestone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MilestoneItem {
    pub kind: ParentKind,
    pub number: u64,
    pub id: u64,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_state_accepts_rest_and_graphql_spelling() {
        let rest: BoardState = serde_json::from_str(r#""open""#).unwrap();
        let graph: BoardState = serde_json::from_str(r#""CLOSED""#).unwrap();
        assert_eq!(rest, BoardState::Open);
        assert_eq!(graph, BoardState::Closed);
    }

    #[test]
    fn test_milestone_board_body_includes_due_date() {
        let milestone: Milestone = serde_json::from_value(serde_json::json!({
            "number": 7,
            "title": "Sprint 7",
            "description": "Ship search",
            "due_on": "2024-01-01T08:00:00Z",
            "state": "open",
            "open_issues": 3
        }))
        .unwrap();

        assert_eq!(milestone.board_body(), "Ship search\nDue on: 2024-01-01");
        assert!(!milestone.is_closed());
    }

    #[test]
    fn test_milestone_without_due_date_uses_description_only() {
        let milestone: Milestone = serde_json::from_value(serde_json::json!({
            "number": 1,
            "title": "Backlog",
            "description": null,
            "due_on": null,
            "state": "closed"
        }))
        .unwrap();

        assert_eq!(milestone.board_body(), "");
        assert!(milestone.is_closed());
        assert_eq!(milestone.open_issues, 0);
    }
}

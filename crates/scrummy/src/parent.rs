//! # Parent Objects
//!
//! Issues and pull requests both own labels, a milestone and project cards.
//! [`ParentObject`] gives them one capability set; [`ParentKind`] is the only
//! place the two differ, and it only carries data (REST path segment, GraphQL
//! field name, card content type). Reconcilers never branch on the kind.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::error::{RemoteError, SyncError};
use crate::models::{Board, BoardState, Column, Label, ParentCard, Repo};
use crate::remote::{Remote, RestClient};
use crate::taxonomy::{self, LabelKind, TypedLabel};

/// Which kind of ticket a parent is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentKind {
    Issue,
    PullRequest,
}

impl ParentKind {
    /// REST collection under `/repos/{owner}/{repo}/`.
    #[must_use]
    pub const fn rest_segment(self) -> &'static str {
        match self {
            Self::Issue => "issues",
            Self::PullRequest => "pulls",
        }
    }

    /// Field on `Repository` in the GraphQL schema.
    #[must_use]
    pub const fn graphql_field(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::PullRequest => "pullRequest",
        }
    }

    /// `content_type` when creating a card for this kind.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Issue => "Issue",
            Self::PullRequest => "PullRequest",
        }
    }

    /// Connection on `Milestone` listing items of this kind.
    #[must_use]
    pub const fn milestone_connection(self) -> &'static str {
        match self {
            Self::Issue => "issues",
            Self::PullRequest => "pullRequests",
        }
    }
}

/// Milestone reference embedded in issue and pull request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MilestoneRef {
    pub number: u64,
    pub title: String,
}

/// Issue or pull request as found in REST bodies and webhook payloads.
#[derive(Debug, Clone, Deserialize)]
pub struct ParentPayload {
    pub number: u64,
    pub id: u64,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub milestone: Option<MilestoneRef>,
    /// Present on issue-shaped bodies that describe a pull request.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl ParentPayload {
    /// Kind of this body, given the kind of the hook or path that produced it.
    #[must_use]
    pub fn kind_or(&self, fallback: ParentKind) -> ParentKind {
        if self.pull_request.is_some() {
            ParentKind::PullRequest
        } else {
            fallback
        }
    }
}

/// An issue or pull request and the operations the reconcilers need on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentObject {
    pub kind: ParentKind,
    pub repo: Repo,
    pub number: u64,
    /// Database ID, used as card `content_id`
    pub id: u64,
    pub labels: Vec<Label>,
    pub milestone: Option<MilestoneRef>,
}

impl ParentObject {
    #[must_use]
    pub fn from_payload(kind: ParentKind, repo: &Repo, payload: ParentPayload) -> Self {
        Self {
            kind: payload.kind_or(kind),
            repo: repo.clone(),
            number: payload.number,
            id: payload.id,
            labels: payload.labels,
            milestone: payload.milestone,
        }
    }

    /// Fetch a parent from its API URL (e.g. a card's `content_url`).
    #[instrument(skip(remote, repo))]
    pub async fn get(remote: &Remote, repo: &Repo, url: &str) -> Result<Self, SyncError> {
        let path = RestClient::path_of(url)?;
        let pulls = format!("/{}/", ParentKind::PullRequest.rest_segment());
        let fallback = if path.contains(&pulls) {
            ParentKind::PullRequest
        } else {
            ParentKind::Issue
        };

        let payload: ParentPayload = remote.rest.get(&path).await?.expect_json(200)?;
        Ok(Self::from_payload(fallback, repo, payload))
    }

    /// The parent's single stage label, if any. More than one is `AmbiguousLabel`.
    pub fn stage(&self) -> Result<Option<TypedLabel>, SyncError> {
        taxonomy::find_at_most_one_by_type(&self.labels, LabelKind::Stage)
    }

    /// Whether the parent carries `kind: value`.
    #[must_use]
    pub fn has_label(&self, kind: LabelKind, value: &str) -> bool {
        taxonomy::match_type_value(&self.labels, kind, value).is_ok()
    }

    // Labels and milestones live on the issue resource for both kinds.
    fn issue_path(&self) -> String {
        format!(
            "/repos/{}/{}/issues/{}",
            self.repo.owner, self.repo.name, self.number
        )
    }

    #[instrument(skip(self, remote), fields(number = self.number))]
    pub async fn add_labels(&self, remote: &Remote, names: &[String]) -> Result<String, RemoteError> {
        let path = format!("{}/labels", self.issue_path());
        remote
            .rest
            .post(&path, &json!({ "labels": names }))
            .await?
            .expect(200)?;

        let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
        Ok(format!("added {} to #{}", quoted.join(", "), self.number))
    }

    #[instrument(skip(self, remote), fields(number = self.number))]
    pub async fn remove_label(&self, remote: &Remote, name: &str) -> Result<String, RemoteError> {
        let path = format!("{}/labels/{}", self.issue_path(), urlencoding::encode(name));
        remote.rest.delete(&path).await?.expect(200)?;
        Ok(format!("removed '{name}' from #{}", self.number))
    }

    /// Every card of this parent, with board state and columns embedded.
    #[instrument(skip(self, remote), fields(number = self.number))]
    pub async fn get_cards(&self, remote: &Remote) -> Result<Vec<ParentCard>, RemoteError> {
        #[derive(serde::Serialize)]
        struct Variables<'a> {
            owner: &'a str,
            name: &'a str,
            number: u64,
        }

        let query = cards_query(self.kind);
        let data: CardsData = remote
            .graph
            .execute(
                &query,
                Variables {
                    owner: &self.repo.owner,
                    name: &self.repo.name,
                    number: self.number,
                },
            )
            .await?;

        let cards: Vec<ParentCard> = data
            .repository
            .and_then(|r| r.parent)
            .map(|p| p.project_cards.nodes)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(CardNode::into_card)
            .collect();

        debug!("Retrieved {} project cards for #{}", cards.len(), self.number);
        Ok(cards)
    }

    /// Live cards on the board named `board_name`.
    pub async fn live_cards_on(
        &self,
        remote: &Remote,
        board_name: &str,
    ) -> Result<Vec<ParentCard>, RemoteError> {
        Ok(self
            .get_cards(remote)
            .await?
            .into_iter()
            .filter(|card| card.is_live() && card.board.is_named(board_name))
            .collect())
    }

    /// Create a card for this parent in `column` of `board`.
    #[instrument(skip(self, remote, board, column), fields(number = self.number, board = %board.name, column = %column.name))]
    pub async fn add_to_board(
        &self,
        remote: &Remote,
        board: &Board,
        column: &Column,
    ) -> Result<String, RemoteError> {
        let path = format!("/projects/columns/{}/cards", column.id);
        let body = json!({
            "content_id": self.id,
            "content_type": self.kind.content_type(),
        });
        remote.rest.post(&path, &body).await?.expect(201)?;
        Ok(format!(
            "added #{} to '{}' in column '{}'",
            self.number, board.name, column.name
        ))
    }

    #[instrument(skip(self, remote), fields(number = self.number))]
    pub async fn clear_milestone(&self, remote: &Remote) -> Result<String, RemoteError> {
        remote
            .rest
            .patch(&self.issue_path(), &json!({ "milestone": Value::Null }))
            .await?
            .expect(200)?;
        Ok(format!("cleared milestone from #{}", self.number))
    }
}

fn cards_query(kind: ParentKind) -> String {
    format!(
        r"
        query ParentCards($owner: String!, $name: String!, $number: Int!) {{
            repository(owner: $owner, name: $name) {{
                parent: {field}(number: $number) {{
                    projectCards(first: 100) {{
                        nodes {{
                            id
                            databaseId
                            isArchived
                            column {{
                                id
                                databaseId
                                name
                            }}
                            project {{
                                id
                                databaseId
                                name
                                state
                                columns(first: 100) {{
                                    nodes {{
                                        id
                                        databaseId
                                        name
                                    }}
                                }}
                            }}
                        }}
                    }}
                }}
            }}
        }}
        ",
        field = kind.graphql_field()
    )
}

#[derive(Debug, Deserialize)]
struct CardsData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    parent: Option<ParentNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParentNode {
    project_cards: Connection<CardNode>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    nodes: Vec<Option<T>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnNode {
    id: String,
    database_id: u64,
    name: String,
}

impl From<ColumnNode> for Column {
    fn from(node: ColumnNode) -> Self {
        Self {
            id: node.database_id,
            node_id: node.id,
            name: node.name,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectNode {
    id: String,
    database_id: u64,
    name: String,
    state: BoardState,
    columns: Connection<ColumnNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CardNode {
    id: String,
    database_id: u64,
    #[serde(default)]
    is_archived: bool,
    column: Option<ColumnNode>,
    project: ProjectNode,
}

impl CardNode {
    fn into_card(self) -> ParentCard {
        ParentCard {
            id: self.database_id,
            node_id: self.id,
            archived: self.is_archived,
            column: self.column.map(Column::from),
            board: Board {
                id: self.project.database_id,
                node_id: self.project.id,
                name: self.project.name,
                state: self.project.state,
            },
            board_columns: self
                .project
                .columns
                .nodes
                .into_iter()
                .flatten()
                .map(Column::from)
                .collect(),
        }
    }
}

//! # Board and Column Resolution
//!
//! Resolves project boards by name or from a card's column/project URLs, and
//! performs the board and card mutations the reconcilers issue.
//!
//! Whether a board mirrors a milestone is never stored: it is recomputed from
//! the repository's milestones on every call, because a milestone can close
//! between two events.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::{RemoteError, SyncError};
use crate::milestones::Milestones;
use crate::models::{Board, Column, Repo};
use crate::remote::{Remote, RestClient};
use crate::taxonomy::same_name;

/// Name of the board every milestone board is cloned from.
pub const TEMPLATE_BOARD: &str = "template";

/// Board lookups scoped to one repository.
#[derive(Debug, Clone, Copy)]
pub struct Boards<'a> {
    remote: &'a Remote,
    repo: &'a Repo,
}

impl<'a> Boards<'a> {
    #[must_use]
    pub const fn new(remote: &'a Remote, repo: &'a Repo) -> Self {
        Self { remote, repo }
    }

    /// Every board of the repository, open or closed.
    #[instrument(skip(self), fields(repo = %self.repo.full_name()))]
    pub async fn list(&self) -> Result<Vec<Board>, RemoteError> {
        let path = format!(
            "/repos/{}/{}/projects?state=all&per_page=100",
            self.repo.owner, self.repo.name
        );
        let boards: Vec<Board> = self.remote.rest.get_all(&path).await?;
        debug!("Retrieved {} project boards", boards.len());
        Ok(boards)
    }

    /// Columns of `board`, in board order.
    #[instrument(skip(self, board), fields(board = %board.name))]
    pub async fn columns(&self, board: &Board) -> Result<Vec<Column>, RemoteError> {
        let path = format!("/projects/{}/columns?per_page=100", board.id);
        self.remote.rest.get_all(&path).await
    }

    /// Whether an open milestone carries this board's name.
    ///
    /// Closed milestones are left out: closing a milestone closes its board,
    /// and every reconciler skips closed boards before asking.
    pub async fn is_milestone_board(&self, board: &Board) -> Result<bool, RemoteError> {
        let milestones = Milestones::new(self.remote, self.repo).list_open().await?;
        Ok(milestones.iter().any(|m| board.is_named(&m.title)))
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Board, SyncError> {
        self.list()
            .await?
            .into_iter()
            .find(|board| board.is_named(name))
            .ok_or_else(|| SyncError::BoardNotFound(name.trim().to_string()))
    }

    pub async fn find_template(&self) -> Result<Board, SyncError> {
        self.list()
            .await?
            .into_iter()
            .find(|board| board.is_named(TEMPLATE_BOARD))
            .ok_or(SyncError::TemplateBoardMissing)
    }

    /// The board mirroring the milestone titled `title`.
    pub async fn find_mirror(&self, title: &str) -> Result<Board, SyncError> {
        self.list()
            .await?
            .into_iter()
            .find(|board| board.is_named(title))
            .ok_or_else(|| SyncError::MirrorBoardMissing(title.to_string()))
    }

    /// Board and column a card sits in, from the URLs in its payload.
    #[instrument(skip(self))]
    pub async fn resolve_column(
        &self,
        column_url: &str,
        project_url: &str,
    ) -> Result<(Board, Column), RemoteError> {
        let column_path = RestClient::path_of(column_url)?;
        let board_path = RestClient::path_of(project_url)?;

        let (column, board) = tokio::try_join!(
            self.remote.rest.get(&column_path),
            self.remote.rest.get(&board_path),
        )?;

        Ok((board.expect_json(200)?, column.expect_json(200)?))
    }
}

/// First column named `name`, case and whitespace insensitive.
#[must_use]
pub fn column_named<'c>(columns: &'c [Column], name: &str) -> Option<&'c Column> {
    columns.iter().find(|column| same_name(&column.name, name))
}

/// Move a card to another column of its board.
#[instrument(skip(remote))]
pub async fn move_card(
    remote: &Remote,
    card_node_id: &str,
    column_node_id: &str,
) -> Result<(), RemoteError> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Variables<'a> {
        card_id: &'a str,
        column_id: &'a str,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Response {
        #[allow(dead_code)]
        move_project_card: serde_json::Value,
    }

    const MUTATION: &str = r"
        mutation MoveCard($cardId: ID!, $columnId: ID!) {
            moveProjectCard(input: { cardId: $cardId, columnId: $columnId }) {
                cardEdge {
                    node {
                        id
                        column {
                            name
                        }
                    }
                }
            }
        }
    ";

    let _: Response = remote
        .graph
        .execute(
            MUTATION,
            Variables {
                card_id: card_node_id,
                column_id: column_node_id,
            },
        )
        .await?;
    Ok(())
}

#[instrument(skip(remote))]
pub async fn delete_card(remote: &Remote, card_id: u64) -> Result<(), RemoteError> {
    let path = format!("/projects/columns/cards/{card_id}");
    remote.rest.delete(&path).await?.expect(204)?;
    Ok(())
}

/// Server-side clone of `template` into a new board owned by `owner_node_id`.
#[instrument(skip(remote, template, body), fields(template = %template.name))]
pub async fn clone_board(
    remote: &Remote,
    owner_node_id: &str,
    template: &Board,
    name: &str,
    body: &str,
) -> Result<String, RemoteError> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct CloneProjectInput<'a> {
        target_owner_id: &'a str,
        source_id: &'a str,
        include_workflows: bool,
        name: &'a str,
        body: &'a str,
        public: bool,
    }

    #[derive(Serialize)]
    struct Variables<'a> {
        input: CloneProjectInput<'a>,
    }

    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Response {
        clone_project: ClonePayload,
    }

    #[derive(Deserialize)]
    struct ClonePayload {
        project: Option<ClonedProject>,
    }

    #[derive(Deserialize)]
    struct ClonedProject {
        name: String,
    }

    const MUTATION: &str = r"
        mutation CloneBoard($input: CloneProjectInput!) {
            cloneProject(input: $input) {
                project {
                    id
                    name
                }
            }
        }
    ";

    let response: Response = remote
        .graph
        .execute(
            MUTATION,
            Variables {
                input: CloneProjectInput {
                    target_owner_id: owner_node_id,
                    source_id: &template.node_id,
                    include_workflows: true,
                    name,
                    body,
                    public: false,
                },
            },
        )
        .await?;

    let created = response
        .clone_project
        .project
        .map_or_else(|| name.to_string(), |p| p.name);
    Ok(format!(
        "created project board '{created}' from '{}'",
        template.name
    ))
}

#[instrument(skip(remote, board), fields(board = %board.name))]
pub async fn close_board(remote: &Remote, board: &Board) -> Result<String, RemoteError> {
    let path = format!("/projects/{}", board.id);
    remote
        .rest
        .patch(&path, &json!({ "state": "closed" }))
        .await?
        .expect(200)?;
    Ok(format!("closed project board '{}'", board.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(id: u64, name: &str) -> Column {
        Column {
            id,
            node_id: format!("PCC_{id}"),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_column_named_ignores_case_and_padding() {
        let columns = vec![column(1, "To Do"), column(2, "In Review")];
        assert_eq!(column_named(&columns, " in review").unwrap().id, 2);
        assert!(column_named(&columns, "Done").is_none());
    }

    #[test]
    fn test_rest_board_decoding() {
        let board: Board = serde_json::from_value(json!({
            "id": 5,
            "node_id": "MDc6UHJvamVjdDU=",
            "name": "Backend",
            "body": "",
            "state": "open",
            "columns_url": "https://api.github.com/projects/5/columns"
        }))
        .unwrap();
        assert!(board.is_open());
        assert!(board.is_named("backend "));
    }
}

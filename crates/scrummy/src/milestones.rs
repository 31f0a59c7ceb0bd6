//! Milestone reads and writes.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::RemoteError;
use crate::models::{Milestone, MilestoneItem, Repo};
use crate::parent::ParentKind;
use crate::remote::Remote;

/// GraphQL page size ceiling.
const MAX_PAGE_SIZE: u64 = 100;

/// Milestone operations scoped to one repository.
#[derive(Debug, Clone, Copy)]
pub struct Milestones<'a> {
    remote: &'a Remote,
    repo: &'a Repo,
}

impl<'a> Milestones<'a> {
    #[must_use]
    pub const fn new(remote: &'a Remote, repo: &'a Repo) -> Self {
        Self { remote, repo }
    }

    /// Open milestones of the repository.
    #[instrument(skip(self), fields(repo = %self.repo.full_name()))]
    pub async fn list_open(&self) -> Result<Vec<Milestone>, RemoteError> {
        let path = format!(
            "/repos/{}/{}/milestones?state=open&per_page=100",
            self.repo.owner, self.repo.name
        );
        self.remote.rest.get_all(&path).await
    }

    #[instrument(skip(self), fields(repo = %self.repo.full_name()))]
    pub async fn close(&self, number: u64) -> Result<String, RemoteError> {
        let path = format!(
            "/repos/{}/{}/milestones/{number}",
            self.repo.owner, self.repo.name
        );
        let closed: Milestone = self
            .remote
            .rest
            .patch(&path, &json!({ "state": "closed" }))
            .await?
            .expect_json(200)?;
        Ok(format!("closed milestone '{}'", closed.title))
    }

    /// Every issue and pull request assigned to `milestone`, open or closed.
    ///
    /// Page size follows the milestone's declared open item count; further
    /// pages are fetched until the connection is exhausted.
    #[instrument(skip(self, milestone), fields(milestone = %milestone.title))]
    pub async fn items(&self, milestone: &Milestone) -> Result<Vec<MilestoneItem>, RemoteError> {
        let page_size = milestone.open_issues.clamp(1, MAX_PAGE_SIZE);

        let (issues, pulls) = tokio::try_join!(
            self.items_of_kind(milestone.number, ParentKind::Issue, page_size),
            self.items_of_kind(milestone.number, ParentKind::PullRequest, page_size),
        )?;

        let mut items = issues;
        items.extend(pulls);
        debug!("Milestone '{}' has {} items", milestone.title, items.len());
        Ok(items)
    }

    async fn items_of_kind(
        &self,
        number: u64,
        kind: ParentKind,
        page_size: u64,
    ) -> Result<Vec<MilestoneItem>, RemoteError> {
        #[derive(Serialize)]
        struct Variables<'v> {
            owner: &'v str,
            name: &'v str,
            number: u64,
            first: u64,
            after: Option<String>,
        }

        let query = items_query(kind);
        let mut items = Vec::new();
        let mut after = None;

        loop {
            let data: ItemsData = self
                .remote
                .graph
                .execute(
                    &query,
                    Variables {
                        owner: &self.repo.owner,
                        name: &self.repo.name,
                        number,
                        first: page_size,
                        after: after.take(),
                    },
                )
                .await?;

            let Some(page) = data
                .repository
                .and_then(|r| r.milestone)
                .map(|m| m.items)
            else {
                break;
            };

            items.extend(page.nodes.into_iter().flatten().map(|node| MilestoneItem {
                kind,
                number: node.number,
                id: node.database_id,
                title: node.title,
            }));

            match (page.page_info.has_next_page, page.page_info.end_cursor) {
                (true, Some(cursor)) => after = Some(cursor),
                _ => break,
            }
        }

        Ok(items)
    }
}

fn items_query(kind: ParentKind) -> String {
    format!(
        r"
        query MilestoneItems($owner: String!, $name: String!, $number: Int!, $first: Int!, $after: String) {{
            repository(owner: $owner, name: $name) {{
                milestone(number: $number) {{
                    items: {connection}(first: $first, after: $after) {{
                        pageInfo {{
                            hasNextPage
                            endCursor
                        }}
                        nodes {{
                            number
                            databaseId
                            title
                        }}
                    }}
                }}
            }}
        }}
        ",
        connection = kind.milestone_connection()
    )
}

#[derive(Debug, Deserialize)]
struct ItemsData {
    repository: Option<RepositoryNode>,
}

#[derive(Debug, Deserialize)]
struct RepositoryNode {
    milestone: Option<MilestoneNode>,
}

#[derive(Debug, Deserialize)]
struct MilestoneNode {
    items: ItemPage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemPage {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<ItemNode>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemNode {
    number: u64,
    database_id: u64,
    title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_items_query_selects_connection_by_kind() {
        assert!(items_query(ParentKind::Issue).contains("items: issues(first: $first"));
        assert!(items_query(ParentKind::PullRequest).contains("items: pullRequests(first: $first"));
    }

    #[test]
    fn test_items_query_includes_closed_items() {
        assert!(!items_query(ParentKind::Issue).contains("states:"));
        assert!(!items_query(ParentKind::PullRequest).contains("states:"));
    }

    #[test]
    fn test_item_page_decoding() {
        let data: ItemsData = serde_json::from_value(json!({
            "repository": { "milestone": { "items": {
                "pageInfo": { "hasNextPage": false, "endCursor": null },
                "nodes": [{ "number": 4, "databaseId": 400, "title": "Fix login" }, null]
            } } }
        }))
        .unwrap();

        let page = data.repository.unwrap().milestone.unwrap().items;
        assert!(!page.page_info.has_next_page);
        assert_eq!(page.nodes.len(), 2);
        assert_eq!(page.nodes[0].as_ref().unwrap().database_id, 400);
    }
}

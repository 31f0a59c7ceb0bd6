//! Shared fixtures: a `MockServer` standing in for the GitHub REST and
//! GraphQL endpoints, and builders for the JSON it serves.

#![allow(dead_code)]

use scrummy::models::Repo;
use scrummy::remote::{Credentials, Remote};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const OWNER: &str = "acme";
pub const REPO: &str = "web";

// =============================================================================
// Setup
// =============================================================================

pub async fn setup() -> (MockServer, Remote, Repo) {
    let server = MockServer::start().await;
    let remote = Remote::new(&server.uri(), Credentials::Bearer("test-token".to_string()))
        .expect("remote client");
    (server, remote, repo())
}

pub fn repo() -> Repo {
    Repo {
        owner: OWNER.to_string(),
        name: REPO.to_string(),
        node_id: Some("R_web".to_string()),
    }
}

pub fn repository_json() -> Value {
    json!({
        "name": REPO,
        "full_name": format!("{OWNER}/{REPO}"),
        "node_id": "R_web",
        "owner": { "login": OWNER }
    })
}

// =============================================================================
// REST bodies
// =============================================================================

pub fn board_json(id: u64, name: &str, state: &str) -> Value {
    json!({
        "id": id,
        "node_id": format!("PRO_{id}"),
        "name": name,
        "body": "",
        "state": state
    })
}

pub fn column_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "node_id": format!("PCC_{id}"),
        "name": name
    })
}

pub fn label_json(id: u64, name: &str) -> Value {
    json!({ "id": id, "name": name })
}

pub fn labels_json(names: &[&str]) -> Vec<Value> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| label_json(i as u64 + 1, name))
        .collect()
}

pub fn issue_json(number: u64, labels: &[&str]) -> Value {
    json!({
        "number": number,
        "id": number * 100,
        "title": format!("Issue {number}"),
        "labels": labels_json(labels),
        "milestone": null
    })
}

pub fn milestone_json(number: u64, title: &str, state: &str, open_issues: u64) -> Value {
    json!({
        "number": number,
        "title": title,
        "description": "Ship search",
        "due_on": "2024-01-01T08:00:00Z",
        "state": state,
        "open_issues": open_issues
    })
}

// =============================================================================
// GraphQL bodies
// =============================================================================

/// One node of a parent's `projectCards` connection.
pub fn card_node(
    id: u64,
    board: (u64, &str, &str),
    column: Option<(u64, &str)>,
    columns: &[(u64, &str)],
) -> Value {
    let (board_id, board_name, board_state) = board;
    let column_node = |(id, name): (u64, &str)| {
        json!({ "id": format!("PCC_{id}"), "databaseId": id, "name": name })
    };

    json!({
        "id": format!("PC_{id}"),
        "databaseId": id,
        "isArchived": false,
        "column": column.map(column_node),
        "project": {
            "id": format!("PRO_{board_id}"),
            "databaseId": board_id,
            "name": board_name,
            "state": board_state,
            "columns": { "nodes": columns.iter().copied().map(column_node).collect::<Vec<_>>() }
        }
    })
}

pub fn cards_response(cards: Vec<Value>) -> Value {
    json!({
        "data": { "repository": { "parent": { "projectCards": { "nodes": cards } } } }
    })
}

pub fn items_response(items: &[(u64, &str)]) -> Value {
    let nodes: Vec<Value> = items
        .iter()
        .map(|(number, title)| json!({ "number": number, "databaseId": number * 100, "title": title }))
        .collect();
    json!({
        "data": { "repository": { "milestone": { "items": {
            "pageInfo": { "hasNextPage": false, "endCursor": null },
            "nodes": nodes
        } } } }
    })
}

// =============================================================================
// Mounting helpers
// =============================================================================

pub async fn mount_get(server: &MockServer, at: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_boards(server: &MockServer, boards: Vec<Value>) {
    mount_get(server, &format!("/repos/{OWNER}/{REPO}/projects"), json!(boards)).await;
}

pub async fn mount_columns(server: &MockServer, board_id: u64, columns: Vec<Value>) {
    mount_get(server, &format!("/projects/{board_id}/columns"), json!(columns)).await;
}

pub async fn mount_open_milestones(server: &MockServer, milestones: Vec<Value>) {
    mount_get(server, &format!("/repos/{OWNER}/{REPO}/milestones"), json!(milestones)).await;
}

pub async fn mount_repo_labels(server: &MockServer, names: &[&str]) {
    mount_get(
        server,
        &format!("/repos/{OWNER}/{REPO}/labels"),
        json!(labels_json(names)),
    )
    .await;
}

pub async fn mount_cards(server: &MockServer, cards: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("projectCards"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cards_response(cards)))
        .mount(server)
        .await;
}

/// `moveProjectCard` mutation, expected exactly `times` times.
pub async fn expect_moves(server: &MockServer, times: u64) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("moveProjectCard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "moveProjectCard": { "cardEdge": { "node": { "id": "PC_1" } } } }
        })))
        .expect(times)
        .mount(server)
        .await;
}

/// `POST /repos/{owner}/{repo}/issues/{number}/labels`, expected `times` times.
pub async fn expect_add_labels(server: &MockServer, number: u64, containing: &str, times: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/repos/{OWNER}/{REPO}/issues/{number}/labels")))
        .and(body_string_contains(containing))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(times)
        .mount(server)
        .await;
}

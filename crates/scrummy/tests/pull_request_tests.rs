//! Pull requests take the same reconciliation paths as issues.

mod common;

use common::*;
use scrummy::Dispatcher;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn pull_request_json(number: u64, labels: &[&str]) -> Value {
    json!({
        "number": number,
        "id": number * 100,
        "title": format!("Pull request {number}"),
        "state": "open",
        "labels": labels_json(labels),
        "milestone": null,
        "head": { "ref": format!("feature-{number}") },
        "base": { "ref": "main" }
    })
}

fn labeled(number: u64, labels: &[&str], added: &str) -> Value {
    json!({
        "action": "labeled",
        "pull_request": pull_request_json(number, labels),
        "label": { "id": 99, "name": added },
        "repository": repository_json()
    })
}

/// Card listing that answers only the pull request query; the issue query must not run.
async fn mount_pull_request_cards(server: &MockServer, cards: Vec<Value>) {
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("parent: pullRequest(number:"))
        .respond_with(ResponseTemplate::new(200).set_body_json(cards_response(cards)))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("parent: issue(number:"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(server)
        .await;
}

// =============================================================================
// Labeled
// =============================================================================

#[tokio::test]
async fn test_pull_request_stage_label_moves_cards_and_removes_old_label() {
    let (server, remote, _) = setup().await;

    mount_pull_request_cards(
        &server,
        vec![card_node(
            80,
            (3, "Backend", "OPEN"),
            Some((31, "Doing")),
            &[(31, "Doing"), (32, "Review")],
        )],
    )
    .await;
    expect_moves(&server, 1).await;
    Mock::given(method("DELETE"))
        .and(path_regex(r"^/repos/acme/web/issues/8/labels/stage.*Doing$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = Dispatcher::new(remote)
        .dispatch(
            "pull_request",
            labeled(8, &["stage: Doing", "stage: Review"], "stage: Review"),
        )
        .await
        .unwrap();

    let applied = outcome.applied_messages();
    assert!(applied.contains(&"removed 'stage: Doing' from #8"));
    assert!(applied.iter().any(|m| m.contains("'Review' in 'Backend'")));
    assert!(outcome.failures().is_empty());
}

#[tokio::test]
async fn test_pull_request_project_label_creates_pull_request_card() {
    let (server, remote, _) = setup().await;

    mount_boards(&server, vec![board_json(3, "Backend", "open")]).await;
    mount_pull_request_cards(&server, vec![]).await;
    mount_columns(&server, 3, vec![column_json(31, "To Do"), column_json(32, "Doing")]).await;
    Mock::given(method("POST"))
        .and(path("/projects/columns/31/cards"))
        .and(body_string_contains("\"content_type\":\"PullRequest\""))
        .and(body_string_contains("\"content_id\":800"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 81 })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = Dispatcher::new(remote)
        .dispatch(
            "pull_request",
            labeled(8, &["project: Backend"], "project: Backend"),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.applied_messages(),
        vec!["added #8 to 'Backend' in column 'To Do'"]
    );
}

// =============================================================================
// Cards
// =============================================================================

#[tokio::test]
async fn test_card_for_pull_request_is_resolved_through_pulls_path() {
    let (server, remote, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/web/pulls/8"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(pull_request_json(8, &["stage: Doing"])),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_get(&server, "/projects/columns/31", column_json(31, "To Do")).await;
    mount_get(&server, "/projects/3", board_json(3, "Backend", "open")).await;
    mount_open_milestones(&server, vec![]).await;
    mount_columns(&server, 3, vec![column_json(31, "To Do"), column_json(32, "Doing")]).await;
    mount_repo_labels(&server, &["project: Backend", "stage: Doing"]).await;
    expect_add_labels(&server, 8, "project: Backend", 1).await;
    expect_moves(&server, 1).await;

    let outcome = Dispatcher::new(remote)
        .dispatch(
            "project_card",
            json!({
                "action": "created",
                "project_card": {
                    "id": 81,
                    "node_id": "PC_81",
                    "column_url": "https://api.github.com/projects/columns/31",
                    "project_url": "https://api.github.com/projects/3",
                    "content_url": "https://api.github.com/repos/acme/web/pulls/8"
                },
                "repository": repository_json()
            }),
        )
        .await
        .unwrap();

    let applied = outcome.applied_messages();
    assert!(applied.contains(&"added 'project: Backend' to #8"));
    assert!(applied.contains(&"moved new card for #8 to 'Doing' in 'Backend'"));
}

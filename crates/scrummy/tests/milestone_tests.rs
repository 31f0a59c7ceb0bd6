//! Milestone mirror boards against a mocked GitHub API.

mod common;

use common::*;
use scrummy::{Dispatcher, SyncError};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

fn milestone_event(action: &str, milestone: Value) -> Value {
    json!({
        "action": action,
        "milestone": milestone,
        "repository": repository_json()
    })
}

fn issue_milestone_event(action: &str, number: u64, labels: &[&str], milestone: Value) -> Value {
    json!({
        "action": action,
        "issue": issue_json(number, labels),
        "milestone": milestone,
        "repository": repository_json()
    })
}

// =============================================================================
// Milestone created
// =============================================================================

#[tokio::test]
async fn test_sprint_scenario_clone_then_seed_stage() {
    let (server, remote, _) = setup().await;
    let dispatcher = Dispatcher::new(remote);

    mount_boards(&server, vec![board_json(1, "template", "open")]).await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("cloneProject"))
        .and(body_string_contains("\"name\":\"Sprint 7\""))
        .and(body_string_contains("Due on: 2024-01-01"))
        .and(body_string_contains("\"sourceId\":\"PRO_1\""))
        .and(body_string_contains("\"targetOwnerId\":\"R_web\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "cloneProject": { "project": { "id": "PRO_7", "name": "Sprint 7" } } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = dispatcher
        .dispatch(
            "milestone",
            milestone_event("created", milestone_json(7, "Sprint 7", "open", 0)),
        )
        .await
        .unwrap();
    assert_eq!(
        outcome.applied_messages(),
        vec!["created project board 'Sprint 7' from 'template'"]
    );

    // A card for #42 lands in "Doing" on the new board.
    mount_get(&server, "/projects/columns/72", column_json(72, "Doing")).await;
    mount_get(&server, "/projects/7", board_json(7, "Sprint 7", "open")).await;
    mount_get(&server, "/repos/acme/web/issues/42", issue_json(42, &[])).await;
    mount_open_milestones(&server, vec![milestone_json(7, "Sprint 7", "open", 1)]).await;
    mount_columns(
        &server,
        7,
        vec![column_json(71, "To Do"), column_json(72, "Doing"), column_json(73, "Done")],
    )
    .await;
    mount_repo_labels(&server, &["stage: Doing"]).await;
    expect_add_labels(&server, 42, "stage: Doing", 1).await;
    expect_add_labels(&server, 42, "project: Sprint 7", 0).await;
    expect_moves(&server, 0).await;

    let outcome = dispatcher
        .dispatch(
            "project_card",
            json!({
                "action": "created",
                "project_card": {
                    "id": 4200,
                    "node_id": "PC_4200",
                    "column_url": "https://api.github.com/projects/columns/72",
                    "project_url": "https://api.github.com/projects/7",
                    "content_url": "https://api.github.com/repos/acme/web/issues/42"
                },
                "repository": repository_json()
            }),
        )
        .await
        .unwrap();

    assert_eq!(outcome.applied_messages(), vec!["added 'stage: Doing' to #42"]);
}

#[tokio::test]
async fn test_milestone_created_without_template_fails() {
    let (server, remote, _) = setup().await;
    mount_boards(&server, vec![board_json(3, "Backend", "open")]).await;

    let result = Dispatcher::new(remote)
        .dispatch(
            "milestone",
            milestone_event("created", milestone_json(7, "Sprint 7", "open", 0)),
        )
        .await;

    assert!(matches!(result, Err(SyncError::TemplateBoardMissing)));
}

// =============================================================================
// Milestone closed
// =============================================================================

#[tokio::test]
async fn test_milestone_closed_keeps_cards_on_mirror() {
    let (server, remote, _) = setup().await;

    mount_boards(
        &server,
        vec![board_json(1, "template", "open"), board_json(7, "Sprint 7", "open")],
    )
    .await;

    Mock::given(method("PATCH"))
        .and(path("/projects/7"))
        .and(body_string_contains("closed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(board_json(7, "Sprint 7", "closed")))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("items: issues("))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_response(&[(4, "Fix login"), (9, "Search")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("items: pullRequests("))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_response(&[(11, "Add search index")])))
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path_regex(r"^/repos/acme/web/issues/(4|9|11)$"))
        .and(body_string_contains("\"milestone\":null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path_regex(r"^/projects/columns/cards/\d+$"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = Dispatcher::new(remote)
        .dispatch(
            "milestone",
            milestone_event("closed", milestone_json(7, "Sprint 7", "closed", 3)),
        )
        .await
        .unwrap();

    let applied = outcome.applied_messages();
    assert_eq!(applied[0], "closed project board 'Sprint 7'");
    assert_eq!(applied.len(), 4);
    assert!(outcome.failures().is_empty());
}

#[tokio::test]
async fn test_milestone_closed_clears_closed_items_too() {
    let (server, remote, _) = setup().await;

    mount_boards(&server, vec![board_json(7, "Sprint 7", "closed")]).await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("items: issues("))
        .and(body_string_contains("\"first\":1,"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_response(&[(4, "Fix login")])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_string_contains("items: pullRequests("))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_response(&[])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/repos/acme/web/issues/4"))
        .and(body_string_contains("\"milestone\":null"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    // Every item is already closed, so the milestone reports no open issues.
    let outcome = Dispatcher::new(remote)
        .dispatch(
            "milestone",
            milestone_event("closed", milestone_json(7, "Sprint 7", "closed", 0)),
        )
        .await
        .unwrap();

    assert_eq!(outcome.applied_messages(), vec!["cleared milestone from #4"]);
}

#[tokio::test]
async fn test_milestone_closed_without_mirror_fails() {
    let (server, remote, _) = setup().await;
    mount_boards(&server, vec![board_json(1, "template", "open")]).await;

    let result = Dispatcher::new(remote)
        .dispatch(
            "milestone",
            milestone_event("closed", milestone_json(7, "Sprint 7", "closed", 0)),
        )
        .await;

    assert!(matches!(result, Err(SyncError::MirrorBoardMissing(title)) if title == "Sprint 7"));
}

// =============================================================================
// Parent milestoned / demilestoned
// =============================================================================

#[tokio::test]
async fn test_parent_milestoned_lands_in_stage_column() {
    let (server, remote, _) = setup().await;

    mount_boards(&server, vec![board_json(7, "Sprint 7", "open")]).await;
    mount_cards(&server, vec![]).await;
    mount_columns(&server, 7, vec![column_json(71, "To Do"), column_json(72, "Doing")]).await;
    Mock::given(method("POST"))
        .and(path("/projects/columns/72/cards"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = Dispatcher::new(remote)
        .dispatch(
            "issues",
            issue_milestone_event(
                "milestoned",
                12,
                &["stage: doing"],
                milestone_json(7, "Sprint 7", "open", 1),
            ),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.applied_messages(),
        vec!["added #12 to 'Sprint 7' in column 'Doing'"]
    );
}

#[tokio::test]
async fn test_parent_demilestoned_deletes_mirror_card() {
    let (server, remote, _) = setup().await;

    mount_cards(
        &server,
        vec![
            card_node(900, (7, "Sprint 7", "OPEN"), Some((72, "Doing")), &[(72, "Doing")]),
            card_node(901, (3, "Backend", "OPEN"), Some((31, "Doing")), &[(31, "Doing")]),
        ],
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/projects/columns/cards/900"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = Dispatcher::new(remote)
        .dispatch(
            "issues",
            issue_milestone_event(
                "demilestoned",
                12,
                &["stage: Doing"],
                milestone_json(7, "Sprint 7", "open", 0),
            ),
        )
        .await
        .unwrap();

    assert_eq!(
        outcome.applied_messages(),
        vec!["deleted card for #12 from 'Sprint 7'"]
    );
}

#[tokio::test]
async fn test_parent_demilestoned_without_card_is_out_of_sync() {
    let (server, remote, _) = setup().await;
    mount_cards(&server, vec![]).await;

    let result = Dispatcher::new(remote)
        .dispatch(
            "issues",
            issue_milestone_event(
                "demilestoned",
                12,
                &[],
                milestone_json(7, "Sprint 7", "open", 0),
            ),
        )
        .await;

    assert!(matches!(result, Err(SyncError::OutOfSync(_))));
}

#[tokio::test]
async fn test_demilestone_from_closed_milestone_keeps_card() {
    let (server, remote, _) = setup().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = Dispatcher::new(remote)
        .dispatch(
            "issues",
            issue_milestone_event(
                "demilestoned",
                12,
                &[],
                milestone_json(7, "Sprint 7", "closed", 0),
            ),
        )
        .await
        .unwrap();

    assert!(outcome.is_noop());
}

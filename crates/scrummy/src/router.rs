//! # Event Router
//!
//! Maps `(event type, action)` to a reconciler. Events about one parent are
//! serialized through [`ParentLocks`]; everything else runs concurrently.
//! Outcomes are logged here and dropped: there is no retry.

use tracing::{debug, error, info, instrument, Instrument};

use crate::concurrent::ParentLocks;
use crate::error::SyncError;
use crate::models::{Label, Milestone, Repo};
use crate::outcome::Outcome;
use crate::parent::ParentObject;
use crate::reconcile::{board, membership, milestone, stage, CardPlacement, Context};
use crate::remote::Remote;
use crate::taxonomy::{LabelKind, TypedLabel};
use crate::webhooks::{
    IssuesEvent, MilestoneEvent, ProjectCardEvent, ProjectEvent, PullRequestEvent, WebhookAction,
    WebhookEvent,
};

/// Routes decoded webhooks to reconcilers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    remote: Remote,
    locks: ParentLocks,
}

impl Dispatcher {
    #[must_use]
    pub fn new(remote: Remote) -> Self {
        Self {
            remote,
            locks: ParentLocks::new(),
        }
    }

    /// Handle one delivery and log what happened. Never fails.
    pub async fn handle(&self, delivery_id: &str, event_type: &str, payload: serde_json::Value) {
        let span = tracing::info_span!("delivery", delivery_id = %delivery_id, event_type = %event_type);
        async {
            match self.dispatch(event_type, payload).await {
                Ok(outcome) => {
                    outcome.log();
                    if outcome.is_noop() {
                        debug!("Delivery required no changes");
                    } else {
                        info!(
                            applied = outcome.applied_messages().len(),
                            failed = outcome.failures().len(),
                            "Delivery processed"
                        );
                    }
                }
                Err(e) => error!(error = %e, "Delivery aborted"),
            }
        }
        .instrument(span)
        .await;
    }

    /// Decode and route one delivery.
    pub async fn dispatch(
        &self,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<Outcome, SyncError> {
        let event = WebhookEvent::parse(event_type, payload)?;
        if let Some(repository) = event.repository() {
            debug!(repository = %repository.full_name, action = %event.action(), "Routing event");
        }

        let _guard = match event.parent_key() {
            Some(key) => Some(self.locks.lock(key).await),
            None => None,
        };

        self.route(event).await
    }

    #[instrument(skip(self, event), fields(action = %event.action()))]
    async fn route(&self, event: WebhookEvent) -> Result<Outcome, SyncError> {
        match event {
            WebhookEvent::Issues(e) => self.on_issues(e).await,
            WebhookEvent::PullRequest(e) => self.on_pull_request(e).await,
            WebhookEvent::ProjectCard(e) => self.on_project_card(e).await,
            WebhookEvent::Project(e) => self.on_project(e).await,
            WebhookEvent::Milestone(e) => self.on_milestone(e).await,
            WebhookEvent::Ignored(event_type) => Ok(Outcome::unchanged(format!(
                "'{event_type}' events are not handled"
            ))),
        }
    }

    async fn on_issues(&self, event: IssuesEvent) -> Result<Outcome, SyncError> {
        let parent = event.parent();
        self.on_parent(event.action, &parent, event.label.as_ref(), event.milestone.as_ref())
            .await
    }

    async fn on_pull_request(&self, event: PullRequestEvent) -> Result<Outcome, SyncError> {
        let parent = event.parent();
        self.on_parent(event.action, &parent, event.label.as_ref(), event.milestone.as_ref())
            .await
    }

    /// Issues and pull requests share every rule.
    async fn on_parent(
        &self,
        action: WebhookAction,
        parent: &ParentObject,
        label: Option<&Label>,
        payload_milestone: Option<&Milestone>,
    ) -> Result<Outcome, SyncError> {
        let ctx = Context::new(&self.remote, &parent.repo);

        match action {
            WebhookAction::Opened => stage::parent_opened(ctx, parent).await,
            WebhookAction::Labeled | WebhookAction::Unlabeled => {
                let Some(label) = label else {
                    return Ok(Outcome::unchanged(format!("no label in '{action}' payload")));
                };
                let Some(typed) = typed_label(label) else {
                    return Ok(Outcome::unchanged(format!(
                        "'{}' is not a stage or project label",
                        label.name
                    )));
                };

                match (action, typed.kind) {
                    (WebhookAction::Labeled, LabelKind::Stage) => {
                        stage::stage_label_added(ctx, parent, &typed).await
                    }
                    (WebhookAction::Labeled, LabelKind::Project) => {
                        membership::project_label_added(ctx, parent, &typed).await
                    }
                    (_, LabelKind::Project) => {
                        membership::project_label_removed(ctx, parent, &typed).await
                    }
                    (_, LabelKind::Stage) => Ok(Outcome::unchanged(format!(
                        "'{}' removed from #{}",
                        typed.name, parent.number
                    ))),
                }
            }
            WebhookAction::Milestoned => {
                let title = payload_milestone
                    .map(|m| m.title.as_str())
                    .or_else(|| parent.milestone.as_ref().map(|m| m.title.as_str()));
                match title {
                    Some(title) => milestone::parent_milestoned(ctx, parent, title).await,
                    None => Ok(Outcome::unchanged("no milestone in 'milestoned' payload")),
                }
            }
            WebhookAction::Demilestoned => match payload_milestone {
                Some(m) => milestone::parent_demilestoned(ctx, parent, m).await,
                None => Ok(Outcome::unchanged("no milestone in 'demilestoned' payload")),
            },
            other => Ok(Outcome::unchanged(format!(
                "'{other}' is not handled for #{}",
                parent.number
            ))),
        }
    }

    async fn on_project_card(&self, event: ProjectCardEvent) -> Result<Outcome, SyncError> {
        let card = &event.project_card;
        let Some(content_url) = card.content_url.as_deref() else {
            return Ok(Outcome::unchanged(format!("card {} is a note", card.id)));
        };

        let handled = matches!(
            event.action,
            WebhookAction::Created
                | WebhookAction::Moved
                | WebhookAction::Deleted
                | WebhookAction::Converted
        );
        if !handled {
            return Ok(Outcome::unchanged(format!(
                "'{}' is not handled for cards",
                event.action
            )));
        }

        let repo = event.repository.to_repo();
        let ctx = Context::new(&self.remote, &repo);
        let placement = resolve_card(ctx, &event, content_url).await?;

        match event.action {
            WebhookAction::Created => membership::card_created(ctx, &placement).await,
            WebhookAction::Moved => stage::card_moved(ctx, &placement).await,
            WebhookAction::Deleted => membership::card_deleted(ctx, &placement).await,
            _ => membership::card_converted(ctx, &placement).await,
        }
    }

    async fn on_project(&self, event: ProjectEvent) -> Result<Outcome, SyncError> {
        let repo = event.repository.to_repo();
        let ctx = Context::new(&self.remote, &repo);

        match event.action {
            WebhookAction::Created => board::board_created(ctx, &event.project).await,
            WebhookAction::Closed => board::board_closed(ctx, &event.project).await,
            other => Ok(Outcome::unchanged(format!(
                "'{other}' is not handled for project boards"
            ))),
        }
    }

    async fn on_milestone(&self, event: MilestoneEvent) -> Result<Outcome, SyncError> {
        let repo: Repo = event.repository.to_repo();
        let ctx = Context::new(&self.remote, &repo);

        match event.action {
            WebhookAction::Created => milestone::milestone_created(ctx, &event.milestone).await,
            WebhookAction::Closed => milestone::milestone_closed(ctx, &event.milestone).await,
            other => Ok(Outcome::unchanged(format!(
                "'{other}' is not handled for milestones"
            ))),
        }
    }
}

/// Parent, board and column a card event concerns, fetched concurrently.
async fn resolve_card(
    ctx: Context<'_>,
    event: &ProjectCardEvent,
    content_url: &str,
) -> Result<CardPlacement, SyncError> {
    let card = &event.project_card;
    let boards = ctx.boards();
    let ((board, column), parent) = tokio::try_join!(
        async {
            boards
                .resolve_column(&card.column_url, &card.project_url)
                .await
                .map_err(SyncError::from)
        },
        ParentObject::get(ctx.remote, ctx.repo, content_url),
    )?;

    Ok(CardPlacement {
        card_id: card.id,
        card_node_id: card.node_id.clone(),
        board,
        column,
        parent,
    })
}

/// Stage or project label, or `None` for labels the engine ignores.
///
/// Labels without a type (`bug`) are ordinary labels here, not errors.
fn typed_label(label: &Label) -> Option<TypedLabel> {
    TypedLabel::parse(&label.name).ok().flatten()
}

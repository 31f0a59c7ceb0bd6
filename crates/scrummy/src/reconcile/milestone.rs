//! # Milestone Mirror
//!
//! Every milestone owns a board of the same name, cloned from the `template`
//! board. Closing the milestone closes the board and releases its items;
//! cards on the closed board stay as a record of the milestone.

use futures::future::join_all;
use tracing::{info, instrument};

use crate::boards::{clone_board, close_board, delete_card};
use crate::error::SyncError;
use crate::models::Milestone;
use crate::outcome::{Entry, Outcome};
use crate::parent::ParentObject;
use crate::reconcile::{stage, Context};

/// Clone the template board for a new milestone.
#[instrument(skip(ctx, milestone), fields(milestone = %milestone.title))]
pub async fn milestone_created(ctx: Context<'_>, milestone: &Milestone) -> Result<Outcome, SyncError> {
    let boards = ctx.boards();
    let existing = boards.list().await?;
    if existing.iter().any(|board| board.is_named(&milestone.title)) {
        return Ok(Outcome::unchanged(format!(
            "project board '{}' already exists",
            milestone.title
        )));
    }

    let template = boards.find_template().await?;
    let owner = ctx.repo.node_id.as_deref().ok_or_else(|| {
        SyncError::OutOfSync(format!(
            "no node id for repository {} to own the new board",
            ctx.repo.full_name()
        ))
    })?;

    let message = clone_board(
        ctx.remote,
        owner,
        &template,
        &milestone.title,
        &milestone.board_body(),
    )
    .await?;
    Ok(Outcome::applied(message))
}

/// Close the mirror board, then clear the milestone from every item assigned to it.
#[instrument(skip(ctx, milestone), fields(milestone = %milestone.title))]
pub async fn milestone_closed(ctx: Context<'_>, milestone: &Milestone) -> Result<Outcome, SyncError> {
    let mirror = ctx.boards().find_mirror(&milestone.title).await?;

    let mut outcome = if mirror.is_open() {
        Outcome::applied(close_board(ctx.remote, &mirror).await?)
    } else {
        Outcome::unchanged(format!("project board '{}' is already closed", mirror.name))
    };

    let items = ctx.milestones().items(milestone).await?;
    info!(
        "Clearing milestone '{}' from {} items",
        milestone.title,
        items.len()
    );

    let clears = items.iter().map(|item| async move {
        let parent = ParentObject {
            kind: item.kind,
            repo: ctx.repo.clone(),
            number: item.number,
            id: item.id,
            labels: Vec::new(),
            milestone: None,
        };
        match parent.clear_milestone(ctx.remote).await {
            Ok(message) => Entry::Applied(message),
            Err(e) => Entry::Failed(format!(
                "couldn't clear milestone from #{} '{}': {e}",
                item.number, item.title
            )),
        }
    });

    outcome.extend(join_all(clears).await.into_iter().collect());
    Ok(outcome)
}

/// A parent was added to the milestone titled `title`: give it a card on the mirror.
#[instrument(skip(ctx, parent), fields(number = parent.number))]
pub async fn parent_milestoned(
    ctx: Context<'_>,
    parent: &ParentObject,
    title: &str,
) -> Result<Outcome, SyncError> {
    let boards = ctx.boards();
    let mirror = boards.find_mirror(title).await?;
    if !mirror.is_open() {
        return Ok(Outcome::unchanged(format!(
            "project board '{}' is closed",
            mirror.name
        )));
    }

    let (cards, columns) = tokio::try_join!(parent.get_cards(ctx.remote), boards.columns(&mirror))?;
    if cards
        .iter()
        .any(|card| card.is_live() && card.board.id == mirror.id)
    {
        return Ok(Outcome::unchanged(format!(
            "#{} already has a card in '{}'",
            parent.number, mirror.name
        )));
    }

    let current = parent.stage()?;
    let column = stage::landing_column(&columns, current.as_ref())
        .ok_or_else(|| SyncError::NoColumns(mirror.name.clone()))?;

    let message = parent.add_to_board(ctx.remote, &mirror, column).await?;
    Ok(Outcome::applied(message))
}

/// A parent was removed from `milestone`: delete its card on the open mirror.
#[instrument(skip(ctx, parent, milestone), fields(number = parent.number, milestone = %milestone.title))]
pub async fn parent_demilestoned(
    ctx: Context<'_>,
    parent: &ParentObject,
    milestone: &Milestone,
) -> Result<Outcome, SyncError> {
    if milestone.is_closed() {
        return Ok(Outcome::unchanged(format!(
            "milestone '{}' is closed, keeping the card for #{}",
            milestone.title, parent.number
        )));
    }

    let cards = parent.live_cards_on(ctx.remote, &milestone.title).await?;
    if cards.is_empty() {
        return Err(SyncError::OutOfSync(format!(
            "#{} was removed from milestone '{}' but has no card in its project board",
            parent.number, milestone.title
        )));
    }

    let deletions = cards.iter().map(|card| async move {
        match delete_card(ctx.remote, card.id).await {
            Ok(()) => Entry::Applied(format!(
                "deleted card for #{} from '{}'",
                parent.number, card.board.name
            )),
            Err(e) => Entry::Failed(format!(
                "couldn't delete card for #{} from '{}': {e}",
                parent.number, card.board.name
            )),
        }
    });

    Ok(join_all(deletions).await.into_iter().collect())
}

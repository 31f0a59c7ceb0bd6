//! # Stage Reconciler
//!
//! Keeps every live card of a parent in the column its `stage:` label names.
//!
//! A card moved by hand never gets moved back by this module. Instead the
//! parent's label is rewritten, and the resulting `labeled` event drives
//! [`stage_label_added`], which removes the stale label and moves the
//! parent's other cards. One code path owns the invariant.

use futures::future::join_all;
use tracing::{debug, instrument};

use crate::boards::{column_named, move_card};
use crate::error::SyncError;
use crate::models::{Column, ParentCard};
use crate::outcome::{Entry, Outcome};
use crate::parent::ParentObject;
use crate::reconcile::{CardPlacement, Context};
use crate::taxonomy::{self, LabelKind, TypedLabel};

/// A corrective step for one card, computed before any call is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStep {
    Move {
        card_node_id: String,
        board: String,
        column: Column,
    },
    MissingColumn {
        board: String,
    },
}

/// Steps that put every live card of a parent into the column named `stage`.
///
/// Archived cards, cards on closed boards and cards already in place are left
/// alone.
#[must_use]
pub fn plan_stage_moves(cards: &[ParentCard], stage: &TypedLabel) -> Vec<StageStep> {
    cards
        .iter()
        .filter(|card| card.is_live() && !card.in_column(&stage.value))
        .map(|card| match column_named(&card.board_columns, &stage.value) {
            Some(column) => StageStep::Move {
                card_node_id: card.node_id.clone(),
                board: card.board.name.clone(),
                column: column.clone(),
            },
            None => StageStep::MissingColumn {
                board: card.board.name.clone(),
            },
        })
        .collect()
}

/// Column a new card should land in: the one matching `stage`, else the first.
#[must_use]
pub fn landing_column<'c>(columns: &'c [Column], stage: Option<&TypedLabel>) -> Option<&'c Column> {
    stage
        .and_then(|label| column_named(columns, &label.value))
        .or_else(|| columns.first())
}

/// `stage: S` was added to a parent.
///
/// Removes the previous stage label and moves live cards to column S. The two
/// run concurrently; a board without column S yields a `Failed` entry while
/// the other boards proceed.
#[instrument(skip(ctx, parent, added), fields(number = parent.number, stage = %added.name))]
pub async fn stage_label_added(
    ctx: Context<'_>,
    parent: &ParentObject,
    added: &TypedLabel,
) -> Result<Outcome, SyncError> {
    let others: Vec<TypedLabel> = taxonomy::find_by_type(&parent.labels, LabelKind::Stage)
        .into_iter()
        .filter(|label| !label.same_label(added))
        .collect();

    if others.len() > 1 {
        return Err(SyncError::AmbiguousLabel {
            kind: LabelKind::Stage.to_string(),
            labels: others.into_iter().map(|l| l.name).collect(),
        });
    }

    let (removal, moves) = tokio::join!(
        remove_previous(ctx, parent, others.first()),
        move_cards_to_stage(ctx, parent, added),
    );

    let mut outcome = Outcome::new();
    outcome.push(removal);
    outcome.extend(moves);
    Ok(outcome)
}

async fn remove_previous(
    ctx: Context<'_>,
    parent: &ParentObject,
    previous: Option<&TypedLabel>,
) -> Entry {
    let Some(previous) = previous else {
        return Entry::Unchanged(format!("No old stage label found on #{}", parent.number));
    };

    match parent.remove_label(ctx.remote, &previous.name).await {
        Ok(message) => Entry::Applied(message),
        Err(e) => Entry::Failed(format!(
            "couldn't remove '{}' from #{}: {e}",
            previous.name, parent.number
        )),
    }
}

async fn move_cards_to_stage(ctx: Context<'_>, parent: &ParentObject, stage: &TypedLabel) -> Outcome {
    let cards = match parent.get_cards(ctx.remote).await {
        Ok(cards) => cards,
        Err(e) => {
            return Outcome::from(Entry::Failed(format!(
                "couldn't list project cards of #{}: {e}",
                parent.number
            )))
        }
    };

    let steps = plan_stage_moves(&cards, stage);
    if steps.is_empty() {
        return Outcome::unchanged(format!(
            "every card of #{} is already in '{}'",
            parent.number, stage.value
        ));
    }

    let moves = steps.into_iter().map(|step| async move {
        match step {
            StageStep::Move {
                card_node_id,
                board,
                column,
            } => match move_card(ctx.remote, &card_node_id, &column.node_id).await {
                Ok(()) => Entry::Applied(format!(
                    "moved card for #{} to '{}' in '{board}'",
                    parent.number, column.name
                )),
                Err(e) => Entry::Failed(format!(
                    "couldn't move card for #{} in '{board}': {e}",
                    parent.number
                )),
            },
            StageStep::MissingColumn { board } => Entry::Failed(format!(
                "couldn't find the stage '{}' in the project '{board}' while moving the card for #{}",
                stage.value, parent.number
            )),
        }
    });

    join_all(moves).await.into_iter().collect()
}

/// A card of the parent was moved to `placement.column` by hand.
///
/// Only the label is edited; the `labeled` event finishes the cascade.
#[instrument(skip(ctx, placement), fields(number = placement.parent.number, column = %placement.column.name))]
pub async fn card_moved(ctx: Context<'_>, placement: &CardPlacement) -> Result<Outcome, SyncError> {
    let parent = &placement.parent;
    if !placement.board.is_open() {
        return Ok(Outcome::unchanged(format!(
            "project board '{}' is closed",
            placement.board.name
        )));
    }

    if let Some(stage) = parent.stage()? {
        if stage.names(&placement.column.name) {
            return Ok(Outcome::unchanged(format!(
                "#{} is already labeled '{}'",
                parent.number, stage.name
            )));
        }
    }

    let label = ctx
        .labels()
        .find_or_create(LabelKind::Stage, &placement.column.name)
        .await?;
    let message = parent
        .add_labels(ctx.remote, &[label.name.clone()])
        .await?;
    Ok(Outcome::applied(message))
}

/// A card was created for the parent in `placement.column`.
///
/// Without a stage label the column seeds one. With a stage label the new
/// card is the one out of place and is moved to the matching column.
#[instrument(skip(ctx, placement, columns), fields(number = placement.parent.number, column = %placement.column.name))]
pub async fn card_created(
    ctx: Context<'_>,
    placement: &CardPlacement,
    columns: &[Column],
) -> Result<Outcome, SyncError> {
    let parent = &placement.parent;

    match parent.stage()? {
        None => {
            let label = ctx
                .labels()
                .find_or_create(LabelKind::Stage, &placement.column.name)
                .await?;
            let message = parent
                .add_labels(ctx.remote, &[label.name.clone()])
                .await?;
            Ok(Outcome::applied(message))
        }
        Some(stage) if stage.names(&placement.column.name) => Ok(Outcome::unchanged(format!(
            "new card for #{} already sits in '{}'",
            parent.number, placement.column.name
        ))),
        Some(stage) => match column_named(columns, &stage.value) {
            Some(target) => {
                move_card(ctx.remote, &placement.card_node_id, &target.node_id).await?;
                Ok(Outcome::applied(format!(
                    "moved new card for #{} to '{}' in '{}'",
                    parent.number, target.name, placement.board.name
                )))
            }
            None => Ok(Outcome::from(Entry::Failed(format!(
                "couldn't find the stage '{}' in the project '{}' while moving the card for #{}",
                stage.value, placement.board.name, parent.number
            )))),
        },
    }
}

/// Seed a stage label on a newly opened parent from the template board.
#[instrument(skip(ctx, parent), fields(number = parent.number))]
pub async fn parent_opened(ctx: Context<'_>, parent: &ParentObject) -> Result<Outcome, SyncError> {
    if let Some(stage) = parent.stage()? {
        debug!("#{} opened with '{}'", parent.number, stage.name);
        return Ok(Outcome::unchanged(format!(
            "#{} already labeled '{}'",
            parent.number, stage.name
        )));
    }

    let boards = ctx.boards();
    let template = boards.find_template().await?;
    let columns = boards.columns(&template).await?;
    let first = columns
        .first()
        .ok_or_else(|| SyncError::NoColumns(template.name.clone()))?;

    let label = ctx.labels().find_or_create(LabelKind::Stage, &first.name).await?;
    let message = parent
        .add_labels(ctx.remote, &[label.name.clone()])
        .await?;
    Ok(Outcome::applied(message))
}

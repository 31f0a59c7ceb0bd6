//! # Membership Reconciler
//!
//! For every open board that does not mirror a milestone, a parent carries
//! `project: B` exactly when it has a live card on B.

use futures::future::join_all;
use tracing::{debug, instrument};

use crate::boards::delete_card;
use crate::error::SyncError;
use crate::models::Board;
use crate::outcome::{Entry, Outcome};
use crate::parent::ParentObject;
use crate::reconcile::{stage, CardPlacement, Context};
use crate::taxonomy::{self, LabelKind, TypedLabel};

/// `project: B` was added to a parent: give it a card in B's first column.
#[instrument(skip(ctx, parent, label), fields(number = parent.number, board = %label.value))]
pub async fn project_label_added(
    ctx: Context<'_>,
    parent: &ParentObject,
    label: &TypedLabel,
) -> Result<Outcome, SyncError> {
    let boards = ctx.boards();
    let (board, cards) = tokio::try_join!(boards.find_by_name(&label.value), async {
        parent.get_cards(ctx.remote).await.map_err(SyncError::from)
    })?;

    if !board.is_open() {
        return Ok(Outcome::unchanged(format!(
            "project board '{}' is closed",
            board.name
        )));
    }

    if cards
        .iter()
        .any(|card| card.is_live() && card.board.id == board.id)
    {
        return Ok(Outcome::unchanged(format!(
            "#{} already has a card in '{}'",
            parent.number, board.name
        )));
    }

    let columns = boards.columns(&board).await?;
    let first = columns
        .first()
        .ok_or_else(|| SyncError::NoColumns(board.name.clone()))?;

    let message = parent.add_to_board(ctx.remote, &board, first).await?;
    Ok(Outcome::applied(message))
}

/// `project: B` was removed from a parent: delete its card on B.
#[instrument(skip(ctx, parent, label), fields(number = parent.number, board = %label.value))]
pub async fn project_label_removed(
    ctx: Context<'_>,
    parent: &ParentObject,
    label: &TypedLabel,
) -> Result<Outcome, SyncError> {
    let cards = parent.live_cards_on(ctx.remote, &label.value).await?;
    if cards.is_empty() {
        return Err(SyncError::CardNotFound {
            board: label.value.clone(),
            number: parent.number,
        });
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

/// A card was created on `placement.board`.
///
/// Outside milestone boards the parent gets the board's `project:` label.
/// In every case the stage reconciler then places the card.
#[instrument(skip(ctx, placement), fields(number = placement.parent.number, board = %placement.board.name))]
pub async fn card_created(ctx: Context<'_>, placement: &CardPlacement) -> Result<Outcome, SyncError> {
    if !placement.board.is_open() {
        return Ok(Outcome::unchanged(format!(
            "project board '{}' is closed",
            placement.board.name
        )));
    }

    let boards = ctx.boards();
    let (is_milestone, columns) = tokio::try_join!(
        boards.is_milestone_board(&placement.board),
        boards.columns(&placement.board),
    )?;

    if columns.is_empty() {
        return Err(SyncError::NoColumns(placement.board.name.clone()));
    }

    let membership = async {
        if is_milestone {
            debug!("'{}' mirrors a milestone", placement.board.name);
            Ok(Outcome::new())
        } else {
            ensure_project_label(ctx, &placement.parent, &placement.board).await
        }
    };

    let (membership, staging) =
        tokio::try_join!(membership, stage::card_created(ctx, placement, &columns))?;

    let mut outcome = membership;
    outcome.extend(staging);
    Ok(outcome)
}

async fn ensure_project_label(
    ctx: Context<'_>,
    parent: &ParentObject,
    board: &Board,
) -> Result<Outcome, SyncError> {
    if parent.has_label(LabelKind::Project, &board.name) {
        return Ok(Outcome::unchanged(format!(
            "#{} already labeled for '{}'",
            parent.number, board.name
        )));
    }

    let label = ctx
        .labels()
        .find_or_create(LabelKind::Project, &board.name)
        .await?;
    let message = parent
        .add_labels(ctx.remote, &[label.name.clone()])
        .await?;
    Ok(Outcome::applied(message))
}

/// A card was deleted from `placement.board`: drop the board's label.
///
/// Repeated deliveries find the label already gone and report unchanged.
#[instrument(skip(ctx, placement), fields(number = placement.parent.number, board = %placement.board.name))]
pub async fn card_deleted(ctx: Context<'_>, placement: &CardPlacement) -> Result<Outcome, SyncError> {
    let parent = &placement.parent;
    let board = &placement.board;

    if !board.is_open() {
        return Ok(Outcome::unchanged(format!(
            "project board '{}' is closed",
            board.name
        )));
    }

    let Ok(label) = taxonomy::match_type_value(&parent.labels, LabelKind::Project, &board.name)
    else {
        return Ok(Outcome::unchanged(format!(
            "#{} has no label for '{}'",
            parent.number, board.name
        )));
    };

    let boards = ctx.boards();
    let (is_milestone, cards) = tokio::try_join!(
        boards.is_milestone_board(board),
        parent.get_cards(ctx.remote),
    )?;

    if is_milestone {
        return Ok(Outcome::unchanged(format!(
            "'{}' mirrors a milestone",
            board.name
        )));
    }

    if cards
        .iter()
        .any(|card| card.is_live() && card.board.id == board.id && card.id != placement.card_id)
    {
        return Ok(Outcome::unchanged(format!(
            "#{} still has a card in '{}'",
            parent.number, board.name
        )));
    }

    let message = parent.remove_label(ctx.remote, &label.name).await?;
    Ok(Outcome::applied(message))
}

/// A note card was converted into a card for `placement.parent`.
///
/// The missing `project:` and `stage:` labels are attached in one call.
#[instrument(skip(ctx, placement), fields(number = placement.parent.number, board = %placement.board.name))]
pub async fn card_converted(ctx: Context<'_>, placement: &CardPlacement) -> Result<Outcome, SyncError> {
    let parent = &placement.parent;
    let board = &placement.board;

    if !board.is_open() {
        return Ok(Outcome::unchanged(format!(
            "project board '{}' is closed",
            board.name
        )));
    }

    let boards = ctx.boards();
    let (is_milestone, columns) =
        tokio::try_join!(boards.is_milestone_board(board), boards.columns(board))?;

    let labels = ctx.labels();
    let wants_project = !is_milestone && !parent.has_label(LabelKind::Project, &board.name);
    let current_stage = parent.stage()?;

    let project = async {
        if wants_project {
            labels
                .find_or_create(LabelKind::Project, &board.name)
                .await
                .map(Some)
        } else {
            Ok(None)
        }
    };
    let stage_label = async {
        if current_stage.is_none() {
            labels
                .find_or_create(LabelKind::Stage, &placement.column.name)
                .await
                .map(Some)
        } else {
            Ok(None)
        }
    };
    let (project, stage_label) = tokio::try_join!(project, stage_label)?;

    let names: Vec<String> = project
        .into_iter()
        .chain(stage_label)
        .map(|label| label.name)
        .collect();

    let mut outcome = Outcome::new();
    if names.is_empty() {
        outcome.push(Entry::Unchanged(format!(
            "#{} already carries its labels for '{}'",
            parent.number, board.name
        )));
    } else {
        outcome.push(Entry::Applied(parent.add_labels(ctx.remote, &names).await?));
    }

    if current_stage.is_some() {
        outcome.extend(stage::card_created(ctx, placement, &columns).await?);
    }

    Ok(outcome)
}

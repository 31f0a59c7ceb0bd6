//! Board lifecycle: `project:` labels follow board creation and closing, and
//! closing a mirror board closes its milestone.

use tracing::instrument;

use crate::boards::TEMPLATE_BOARD;
use crate::error::SyncError;
use crate::labels::color_for;
use crate::models::Board;
use crate::outcome::Outcome;
use crate::reconcile::Context;
use crate::taxonomy::{self, LabelKind, TypedLabel};

/// Create the `project:` label for a new board.
#[instrument(skip(ctx, board), fields(board = %board.name))]
pub async fn board_created(ctx: Context<'_>, board: &Board) -> Result<Outcome, SyncError> {
    if board.is_named(TEMPLATE_BOARD) {
        return Ok(Outcome::unchanged("the template board gets no project label"));
    }

    let boards = ctx.boards();
    let labels = ctx.labels();
    let (is_milestone, existing) =
        tokio::try_join!(boards.is_milestone_board(board), labels.list())?;

    if is_milestone {
        return Ok(Outcome::unchanged(format!(
            "'{}' mirrors a milestone",
            board.name
        )));
    }

    if let Ok(label) = taxonomy::match_type_value(&existing, LabelKind::Project, &board.name) {
        return Ok(Outcome::unchanged(format!(
            "label '{}' already exists",
            label.name
        )));
    }

    let wanted = TypedLabel::canonical(LabelKind::Project, &board.name);
    labels
        .create(&wanted.name, color_for(LabelKind::Project))
        .await?;
    Ok(Outcome::applied(format!("created label '{}'", wanted.name)))
}

/// A board was closed: close its milestone, or retire its `project:` label.
#[instrument(skip(ctx, board), fields(board = %board.name))]
pub async fn board_closed(ctx: Context<'_>, board: &Board) -> Result<Outcome, SyncError> {
    let labels = ctx.labels();
    let milestones = ctx.milestones();
    let (open, existing) = tokio::try_join!(milestones.list_open(), labels.list())?;

    if let Some(milestone) = open.iter().find(|m| board.is_named(&m.title)) {
        let message = milestones.close(milestone.number).await?;
        return Ok(Outcome::applied(message));
    }

    match taxonomy::match_type_value(&existing, LabelKind::Project, &board.name) {
        Ok(label) => {
            labels.delete(&label.name).await?;
            Ok(Outcome::applied(format!("deleted label '{}'", label.name)))
        }
        Err(_) => Ok(Outcome::unchanged(format!(
            "no project label for '{}'",
            board.name
        ))),
    }
}

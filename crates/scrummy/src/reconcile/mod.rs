//! # Reconcilers
//!
//! Each reconciler restores one invariant after a single observed change:
//!
//! - **`stage`**: every live card of a parent sits in the column its `stage:` label names
//! - **`membership`**: a parent carries `project: B` exactly when it has a live card on board B
//! - **`milestone`**: every milestone has one mirror board, closed together with it
//! - **`board`**: board creation and closing keep `project:` labels and milestones aligned
//!
//! Reconcilers read current remote state, compute a small set of corrective
//! calls, issue independent calls concurrently, and report an [`Outcome`].
//!
//! [`Outcome`]: crate::outcome::Outcome

pub mod board;
pub mod membership;
pub mod milestone;
pub mod stage;

use crate::boards::Boards;
use crate::labels::Labels;
use crate::milestones::Milestones;
use crate::models::{Board, Column, Repo};
use crate::parent::ParentObject;
use crate::remote::Remote;

/// Remote clients and the repository an event concerns.
#[derive(Debug, Clone, Copy)]
pub struct Context<'a> {
    pub remote: &'a Remote,
    pub repo: &'a Repo,
}

impl<'a> Context<'a> {
    #[must_use]
    pub const fn new(remote: &'a Remote, repo: &'a Repo) -> Self {
        Self { remote, repo }
    }

    #[must_use]
    pub const fn boards(&self) -> Boards<'a> {
        Boards::new(self.remote, self.repo)
    }

    #[must_use]
    pub const fn labels(&self) -> Labels<'a> {
        Labels::new(self.remote, self.repo)
    }

    #[must_use]
    pub const fn milestones(&self) -> Milestones<'a> {
        Milestones::new(self.remote, self.repo)
    }
}

/// A card event resolved to the parent, board and column it concerns.
#[derive(Debug, Clone)]
pub struct CardPlacement {
    /// Card database ID
    pub card_id: u64,
    /// Card GraphQL node ID
    pub card_node_id: String,
    pub board: Board,
    pub column: Column,
    pub parent: ParentObject,
}

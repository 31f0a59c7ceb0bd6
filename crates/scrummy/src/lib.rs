//! Label, project board and milestone synchronization for GitHub repositories.
//!
//! This crate provides:
//! - A `type: value` label taxonomy (`stage:` and `project:` labels)
//! - REST and GraphQL clients for the GitHub API
//! - Reconcilers restoring label/board/milestone invariants after each event
//! - Webhook payload parsing and signature verification
//! - HTTP server for webhook handling (standalone service)

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Every remote operation can fail

pub mod boards;
pub mod concurrent;
pub mod config;
pub mod error;
pub mod labels;
pub mod milestones;
pub mod models;
pub mod outcome;
pub mod parent;
pub mod reconcile;
pub mod remote;
pub mod router;
pub mod server;
pub mod taxonomy;
pub mod webhooks;

pub use concurrent::{ParentKey, ParentLocks};
pub use config::Config;
pub use error::{RemoteError, SyncError};
pub use outcome::{Entry, Outcome};
pub use parent::{ParentKind, ParentObject};
pub use remote::{Credentials, Remote};
pub use router::Dispatcher;
pub use taxonomy::{LabelKind, TypedLabel};
pub use webhooks::{verify_signature, WebhookEvent};

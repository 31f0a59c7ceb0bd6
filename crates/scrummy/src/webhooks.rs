//! GitHub webhook payload parsing and signature verification.

use std::fmt;

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha1::Sha1;
use subtle::ConstantTimeEq;

use crate::concurrent::ParentKey;
use crate::error::SyncError;
use crate::models::{Board, Label, Milestone, Repo};
use crate::parent::{ParentKind, ParentObject, ParentPayload};

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the HMAC-SHA1 of the raw body.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";
/// Header naming the event type.
pub const EVENT_HEADER: &str = "X-GitHub-Event";
/// Header carrying the delivery GUID.
pub const DELIVERY_HEADER: &str = "X-GitHub-Delivery";

/// Verify a GitHub webhook signature.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - `X-Hub-Signature` header value, `sha1=<hex>`
/// * `secret` - Webhook secret
///
/// # Returns
/// `true` if signature is valid, `false` otherwise
#[must_use]
pub fn verify_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let Some(hex_digest) = signature.trim().strip_prefix("sha1=") else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(hex_digest) else {
        return false;
    };

    let Ok(mut mac) = HmacSha1::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// `sha1=<hex>` signature of `body`, as GitHub sends it.
#[must_use]
pub fn sign(body: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!("sha1={}", hex::encode(mac.finalize().into_bytes())))
}

/// Webhook action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookAction {
    Created,
    Closed,
    Deleted,
    Reopened,
    Edited,
    Labeled,
    Unlabeled,
    Milestoned,
    Demilestoned,
    Opened,
    Moved,
    Converted,
    /// Unknown action (catch-all to avoid parse failures)
    #[serde(other)]
    Unknown,
}

impl fmt::Display for WebhookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Closed => "closed",
            Self::Deleted => "deleted",
            Self::Reopened => "reopened",
            Self::Edited => "edited",
            Self::Labeled => "labeled",
            Self::Unlabeled => "unlabeled",
            Self::Milestoned => "milestoned",
            Self::Demilestoned => "demilestoned",
            Self::Opened => "opened",
            Self::Moved => "moved",
            Self::Converted => "converted",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Repository block present in every event.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryPayload {
    /// Repository name
    pub name: String,
    /// Full name (owner/repo)
    pub full_name: String,
    /// Owning user or organization
    pub owner: Owner,
    /// GraphQL node ID
    #[serde(default)]
    pub node_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Owner {
    pub login: String,
}

impl RepositoryPayload {
    #[must_use]
    pub fn to_repo(&self) -> Repo {
        Repo {
            owner: self.owner.login.clone(),
            name: self.name.clone(),
            node_id: self.node_id.clone(),
        }
    }
}

/// `issues` event
#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
    pub action: WebhookAction,
    pub issue: ParentPayload,
    /// Label added or removed, on `labeled` / `unlabeled`
    #[serde(default)]
    pub label: Option<Label>,
    /// Milestone set or removed, on `milestoned` / `demilestoned`
    #[serde(default)]
    pub milestone: Option<Milestone>,
    pub repository: RepositoryPayload,
}

/// `pull_request` event
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    pub action: WebhookAction,
    pub pull_request: ParentPayload,
    #[serde(default)]
    pub label: Option<Label>,
    #[serde(default)]
    pub milestone: Option<Milestone>,
    pub repository: RepositoryPayload,
}

/// Card block of a `project_card` event.
#[derive(Debug, Clone, Deserialize)]
pub struct CardPayload {
    /// Card ID
    pub id: u64,
    /// GraphQL node ID
    pub node_id: String,
    pub column_url: String,
    pub project_url: String,
    /// API URL of the issue or pull request, absent for notes
    #[serde(default)]
    pub content_url: Option<String>,
}

impl CardPayload {
    /// Parent number, taken from the last segment of `content_url`.
    #[must_use]
    pub fn content_number(&self) -> Option<u64> {
        self.content_url
            .as_deref()?
            .trim_end_matches('/')
            .rsplit('/')
            .next()?
            .parse()
            .ok()
    }
}

/// `project_card` event
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectCardEvent {
    pub action: WebhookAction,
    pub project_card: CardPayload,
    pub repository: RepositoryPayload,
}

/// `project` event
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectEvent {
    pub action: WebhookAction,
    pub project: Board,
    pub repository: RepositoryPayload,
}

/// `milestone` event
#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneEvent {
    pub action: WebhookAction,
    pub milestone: Milestone,
    pub repository: RepositoryPayload,
}

/// A decoded webhook, keyed by its `X-GitHub-Event` type.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    Issues(IssuesEvent),
    PullRequest(PullRequestEvent),
    ProjectCard(ProjectCardEvent),
    Project(ProjectEvent),
    Milestone(MilestoneEvent),
    /// Event type the engine does not handle (`ping`, `push`, ...)
    Ignored(String),
}

impl WebhookEvent {
    /// Decode `payload` according to `event_type`.
    pub fn parse(event_type: &str, payload: Value) -> Result<Self, SyncError> {
        let wrap = |source| SyncError::Payload {
            event: event_type.to_string(),
            source,
        };

        Ok(match event_type {
            "issues" => Self::Issues(serde_json::from_value(payload).map_err(wrap)?),
            "pull_request" => Self::PullRequest(serde_json::from_value(payload).map_err(wrap)?),
            "project_card" => Self::ProjectCard(serde_json::from_value(payload).map_err(wrap)?),
            "project" => Self::Project(serde_json::from_value(payload).map_err(wrap)?),
            "milestone" => Self::Milestone(serde_json::from_value(payload).map_err(wrap)?),
            other => Self::Ignored(other.to_string()),
        })
    }

    /// Action of the event, `Unknown` for ignored event types.
    #[must_use]
    pub const fn action(&self) -> WebhookAction {
        match self {
            Self::Issues(e) => e.action,
            Self::PullRequest(e) => e.action,
            Self::ProjectCard(e) => e.action,
            Self::Project(e) => e.action,
            Self::Milestone(e) => e.action,
            Self::Ignored(_) => WebhookAction::Unknown,
        }
    }

    #[must_use]
    pub const fn repository(&self) -> Option<&RepositoryPayload> {
        match self {
            Self::Issues(e) => Some(&e.repository),
            Self::PullRequest(e) => Some(&e.repository),
            Self::ProjectCard(e) => Some(&e.repository),
            Self::Project(e) => Some(&e.repository),
            Self::Milestone(e) => Some(&e.repository),
            Self::Ignored(_) => None,
        }
    }

    /// Parent this event concerns, for per-parent serialization.
    ///
    /// Board and milestone events are not tied to one parent.
    #[must_use]
    pub fn parent_key(&self) -> Option<ParentKey> {
        let (repository, number) = match self {
            Self::Issues(e) => (&e.repository, e.issue.number),
            Self::PullRequest(e) => (&e.repository, e.pull_request.number),
            Self::ProjectCard(e) => (&e.repository, e.project_card.content_number()?),
            Self::Project(_) | Self::Milestone(_) | Self::Ignored(_) => return None,
        };
        Some(ParentKey::new(&repository.full_name, number))
    }
}

impl IssuesEvent {
    #[must_use]
    pub fn parent(&self) -> ParentObject {
        ParentObject::from_payload(
            ParentKind::Issue,
            &self.repository.to_repo(),
            self.issue.clone(),
        )
    }
}

impl PullRequestEvent {
    #[must_use]
    pub fn parent(&self) -> ParentObject {
        ParentObject::from_payload(
            ParentKind::PullRequest,
            &self.repository.to_repo(),
            self.pull_request.clone(),
        )
    }
}

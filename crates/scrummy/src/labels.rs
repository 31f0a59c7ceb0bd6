//! Repository label operations.

use serde_json::json;
use tracing::{info, instrument};

use crate::error::{RemoteError, SyncError};
use crate::models::{Label, Repo};
use crate::remote::Remote;
use crate::taxonomy::{self, LabelKind, TypedLabel};

/// Label operations scoped to one repository.
#[derive(Debug, Clone, Copy)]
pub struct Labels<'a> {
    remote: &'a Remote,
    repo: &'a Repo,
}

impl<'a> Labels<'a> {
    #[must_use]
    pub const fn new(remote: &'a Remote, repo: &'a Repo) -> Self {
        Self { remote, repo }
    }

    #[instrument(skip(self), fields(repo = %self.repo.full_name()))]
    pub async fn list(&self) -> Result<Vec<Label>, RemoteError> {
        let path = format!(
            "/repos/{}/{}/labels?per_page=100",
            self.repo.owner, self.repo.name
        );
        self.remote.rest.get_all(&path).await
    }

    #[instrument(skip(self), fields(repo = %self.repo.full_name()))]
    pub async fn create(&self, name: &str, color: &str) -> Result<Label, RemoteError> {
        let path = format!("/repos/{}/{}/labels", self.repo.owner, self.repo.name);
        self.remote
            .rest
            .post(&path, &json!({ "name": name, "color": color }))
            .await?
            .expect_json(201)
    }

    #[instrument(skip(self), fields(repo = %self.repo.full_name()))]
    pub async fn delete(&self, name: &str) -> Result<(), RemoteError> {
        let path = format!(
            "/repos/{}/{}/labels/{}",
            self.repo.owner,
            self.repo.name,
            urlencoding::encode(name)
        );
        self.remote.rest.delete(&path).await?.expect(204)?;
        Ok(())
    }

    /// The repository's `kind: value` label, created when missing.
    ///
    /// An existing label keeps its exact remote spelling.
    pub async fn find_or_create(
        &self,
        kind: LabelKind,
        display_value: &str,
    ) -> Result<TypedLabel, SyncError> {
        let existing = self.list().await?;
        if let Ok(label) = taxonomy::match_type_value(&existing, kind, display_value) {
            if let Some(typed) = TypedLabel::parse(&label.name)? {
                return Ok(typed);
            }
        }

        let wanted = TypedLabel::canonical(kind, display_value);
        self.create(&wanted.name, color_for(kind)).await?;
        info!(label = %wanted.name, "Created missing label");
        Ok(wanted)
    }
}

/// Default colour for labels the engine creates.
#[must_use]
pub const fn color_for(kind: LabelKind) -> &'static str {
    match kind {
        LabelKind::Stage => "fbca04",
        LabelKind::Project => "1d76db",
    }
}

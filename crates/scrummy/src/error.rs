//! Error types for the reconciliation engine and its remote clients.

use thiserror::Error;

/// Errors surfaced by the REST and GraphQL clients.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a status other than the one the operation documents.
    #[error("expected: {expected} received {status} {method} {path}\nresponse data: {body}")]
    UnexpectedStatus {
        method: String,
        path: String,
        expected: u16,
        status: u16,
        body: String,
    },

    /// The GraphQL endpoint returned an `errors` array.
    #[error("GraphQL errors: {}", messages.join(", "))]
    Graph { messages: Vec<String> },

    /// A response body did not have the expected shape.
    #[error("failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// A URL handed over by a webhook could not be parsed.
    #[error("invalid resource URL '{0}'")]
    InvalidUrl(String),
}

/// Errors that abort a single reconciliation handler.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Label has no `type:` prefix.
    #[error("couldn't find a type on the label '{0}'")]
    MalformedLabel(String),

    /// More than one label of a type that must be unique.
    #[error("found {} '{kind}' labels ({}), refusing to guess which one is current", labels.len(), labels.join(", "))]
    AmbiguousLabel { kind: String, labels: Vec<String> },

    #[error("no '{0}' label found")]
    LabelNotFound(String),

    #[error("couldn't find a project board named '{0}'")]
    BoardNotFound(String),

    #[error("no 'template' project board exists to clone from")]
    TemplateBoardMissing,

    #[error("couldn't find the project board for milestone '{0}'")]
    MirrorBoardMissing(String),

    #[error("project board '{0}' has no columns")]
    NoColumns(String),

    #[error("couldn't find a project card in '{board}' for #{number}")]
    CardNotFound { board: String, number: u64 },

    /// Remote state does not match what the triggering event implies.
    #[error("out of sync: {0}")]
    OutOfSync(String),

    /// Webhook payload did not decode into the shape its event type promises.
    #[error("invalid '{event}' payload: {source}")]
    Payload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

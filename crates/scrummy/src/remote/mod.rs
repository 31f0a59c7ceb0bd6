//! Remote collaborators: the REST resource client and the GraphQL client.
//!
//! Both share one `reqwest` connection pool and the same credentials.

pub mod graph;
pub mod rest;

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::RequestBuilder;

pub use graph::GraphClient;
pub use rest::{RestClient, RestResponse};

use crate::error::RemoteError;

/// Default GitHub API endpoint
pub const GITHUB_API_URL: &str = "https://api.github.com";

/// API credentials.
#[derive(Clone)]
pub enum Credentials {
    /// Basic auth with a login and a token or password.
    Basic { user: String, token: String },
    /// `Authorization: Bearer <token>`
    Bearer(String),
}

impl Credentials {
    /// Basic auth when a user is known, bearer otherwise.
    #[must_use]
    pub fn new(user: Option<String>, token: String) -> Self {
        match user {
            Some(user) => Self::Basic { user, token },
            None => Self::Bearer(token),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Basic { user, token } => request.basic_auth(user, Some(token)),
            Self::Bearer(token) => request.bearer_auth(token),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("token", &"<redacted>")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"<redacted>").finish(),
        }
    }
}

/// Both remote clients, cheap to clone.
#[derive(Debug, Clone)]
pub struct Remote {
    pub rest: RestClient,
    pub graph: GraphClient,
}

impl Remote {
    /// Build both clients against `base_url` (GraphQL lives at `<base_url>/graphql`).
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, RemoteError> {
        let mut headers = HeaderMap::new();
        // Classic projects still sit behind the inertia preview media type.
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.inertia-preview+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("scrummy/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            rest: RestClient::new(client.clone(), base_url, credentials.clone()),
            graph: GraphClient::new(client, base_url, credentials),
        })
    }
}

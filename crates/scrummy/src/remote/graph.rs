//! GraphQL client for the GitHub v4 API.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, instrument};

use super::Credentials;
use crate::error::RemoteError;

/// GraphQL client posting to `<base>/graphql`.
#[derive(Debug, Clone)]
pub struct GraphClient {
    client: reqwest::Client,
    url: String,
    credentials: Credentials,
}

/// GraphQL request body
#[derive(Debug, Serialize)]
struct GraphQLRequest<'a, V: Serialize> {
    query: &'a str,
    variables: V,
}

/// GraphQL response wrapper
#[derive(Debug, Deserialize)]
struct GraphQLResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQLError>>,
}

/// GraphQL error
#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

impl GraphClient {
    pub(crate) fn new(client: reqwest::Client, base_url: &str, credentials: Credentials) -> Self {
        Self {
            client,
            url: format!("{}/graphql", base_url.trim_end_matches('/')),
            credentials,
        }
    }

    /// Execute a query or mutation.
    ///
    /// A 200 status is necessary but not sufficient: any `errors` entry fails
    /// the call even when `data` is present.
    #[instrument(skip(self, query, variables))]
    pub async fn execute<V: Serialize, R: DeserializeOwned>(
        &self,
        query: &str,
        variables: V,
    ) -> Result<R, RemoteError> {
        let request = GraphQLRequest { query, variables };

        let response = self
            .credentials
            .apply(self.client.post(&self.url))
            .json(&request)
            .send()
            .await?;

        let status = response.status().as_u16();
        let raw = response.text().await?;
        if status != 200 {
            return Err(RemoteError::UnexpectedStatus {
                method: "POST".to_string(),
                path: "/graphql".to_string(),
                expected: 200,
                status,
                body: raw,
            });
        }

        let gql_response: GraphQLResponse<R> =
            serde_json::from_str(&raw).map_err(|source| RemoteError::Decode {
                path: "/graphql".to_string(),
                source,
            })?;

        if let Some(errors) = gql_response.errors {
            if !errors.is_empty() {
                return Err(RemoteError::Graph {
                    messages: errors.into_iter().map(|e| e.message).collect(),
                });
            }
        }

        debug!("GraphQL call completed");

        gql_response.data.ok_or_else(|| RemoteError::Graph {
            messages: vec!["no data in GraphQL response".to_string()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_request_serialization() {
        #[derive(Serialize)]
        struct TestVars {
            number: u64,
        }

        let request = GraphQLRequest {
            query: "query { viewer { login } }",
            variables: TestVars { number: 42 },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""query":"query { viewer { login } }""#));
        assert!(json.contains(r#""number":42"#));
    }

    #[test]
    fn test_response_with_errors_and_data_still_carries_errors() {
        let parsed: GraphQLResponse<serde_json::Value> = serde_json::from_str(
            r#"{"data":{"ok":true},"errors":[{"message":"Resource not accessible"}]}"#,
        )
        .unwrap();
        assert!(parsed.data.is_some());
        assert_eq!(parsed.errors.unwrap()[0].message, "Resource not accessible");
    }
}

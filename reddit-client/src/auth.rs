use history_core::{CoreError, Credentials, RedditApiError};
use oauth2::{AccessToken, ClientId, ClientSecret, ResourceOwnerPassword, ResourceOwnerUsername};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

/// Everything the token endpoint needs for a resource-owner password grant.
#[derive(Debug, Clone)]
pub struct PasswordGrant {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub username: ResourceOwnerUsername,
    pub password: ResourceOwnerPassword,
}

impl From<&Credentials> for PasswordGrant {
    fn from(credentials: &Credentials) -> Self {
        Self {
            client_id: ClientId::new(credentials.client_id.clone()),
            client_secret: ClientSecret::new(credentials.client_secret.clone()),
            username: ResourceOwnerUsername::new(credentials.username.clone()),
            password: ResourceOwnerPassword::new(credentials.password.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: Option<AccessToken>,
    token_type: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
    error: Option<serde_json::Value>,
}

#[derive(Debug)]
pub struct Authenticator {
    http_client: Client,
    token_url: Url,
}

impl Authenticator {
    pub fn new(token_url: Url, user_agent: &str) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            token_url,
        })
    }

    /// Exchanges the grant for a bearer token. One attempt, no retry.
    pub async fn authenticate(&self, grant: &PasswordGrant) -> Result<AccessToken, CoreError> {
        info!("Requesting access token for {}", grant.username.as_str());

        let response = self
            .http_client
            .post(self.token_url.clone())
            .basic_auth(grant.client_id.as_str(), Some(grant.client_secret.secret()))
            .form(&[
                ("grant_type", "password"),
                ("username", grant.username.as_str()),
                ("password", grant.password.secret().as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                error!("Token request failed: {}", e);
                if e.is_timeout() {
                    CoreError::RedditApi(RedditApiError::RequestTimeout)
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        let body = response.text().await?;
        info!("Token endpoint responded with {}", status);

        parse_token_response(status, &body)
    }
}

/// Interprets a token endpoint reply.
///
/// The endpoint reports bad credentials with a 200 and an `error` field, so
/// the body is checked even on success.
pub fn parse_token_response(status: StatusCode, body: &str) -> Result<AccessToken, CoreError> {
    let parsed: Option<TokenEndpointResponse> = serde_json::from_str(body).ok();

    if !status.is_success() {
        let detail = parsed
            .as_ref()
            .and_then(|p| p.error.as_ref())
            .map(|e| format!(" ({})", describe_error(e)))
            .unwrap_or_default();
        return Err(RedditApiError::AuthenticationFailed {
            reason: format!("token endpoint returned {}{}", status, detail),
        }
        .into());
    }

    let parsed = parsed.ok_or_else(|| RedditApiError::InvalidResponse {
        details: "token endpoint returned a non-JSON body".to_string(),
    })?;

    if let Some(err) = parsed.error.as_ref() {
        return Err(RedditApiError::AuthenticationFailed {
            reason: describe_error(err),
        }
        .into());
    }

    let token = parsed
        .access_token
        .filter(|token| !token.secret().is_empty())
        .ok_or_else(|| RedditApiError::AuthenticationFailed {
            reason: "response did not contain an access_token".to_string(),
        })?;

    debug!(
        "Token type {:?}, expires in {:?}s, scope {:?}",
        parsed.token_type, parsed.expires_in, parsed.scope
    );
    Ok(token)
}

fn describe_error(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

use crate::listing::{ActivityItem, PageRequest, RedditListing};
use crate::rate_limiter::{RateLimitConfig, RateLimitHeaders, RateLimitStatus, RateLimiter};
use history_core::{CoreError, RedditApiError};
use oauth2::AccessToken;
use reqwest::{Client, Method, Response, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};
use url::Url;

#[derive(Debug)]
pub struct RedditApiClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    api_base: Url,
    user_agent: String,
}

impl RedditApiClient {
    pub fn new(
        user_agent: String,
        api_base: Url,
        rate_config: RateLimitConfig,
    ) -> Result<Self, CoreError> {
        let rate_limiter = Arc::new(RateLimiter::new(rate_config));

        let http_client = Client::builder()
            .user_agent(&user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http_client,
            rate_limiter,
            api_base,
            user_agent,
        })
    }

    /// Builds `{api_base}/user/{user}/{category}.json`, escaping the user name.
    pub fn listing_url(&self, request: &PageRequest) -> Result<Url, CoreError> {
        let file_name = format!("{}.json", request.category);
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| CoreError::InvalidInput {
                message: format!("API base {} cannot carry a path", self.api_base),
            })?
            .pop_if_empty()
            .extend(&["user", request.user.as_str(), file_name.as_str()]);
        Ok(url)
    }

    pub async fn make_request(
        &self,
        method: Method,
        url: Url,
        access_token: &AccessToken,
        query_params: Option<&[(&str, &str)]>,
    ) -> Result<Response, CoreError> {
        let endpoint = url.path().to_string();

        let permit = self.rate_limiter.acquire_permit().await;
        debug!(
            "Acquired rate limit permit for {} {} after {:?}",
            method, endpoint, permit.queue_wait_time
        );

        let mut request_builder = self
            .http_client
            .request(method.clone(), url)
            .bearer_auth(access_token.secret())
            .header("User-Agent", &self.user_agent);

        if let Some(params) = query_params {
            request_builder = request_builder.query(params);
        }

        info!("Making Reddit API request: {} {}", method, endpoint);
        let response = request_builder.send().await.map_err(|e| {
            error!("Network error for {} {}: {}", method, endpoint, e);
            if e.is_timeout() {
                CoreError::RedditApi(RedditApiError::RequestTimeout)
            } else {
                CoreError::Network(e)
            }
        })?;

        let headers = RateLimitHeaders::from_headers(response.headers());
        headers.log();
        self.rate_limiter.record_headers(headers).await;

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());

        if let Some(err) = classify_status(response.status(), retry_after, &endpoint) {
            error!(
                "Request failed with status: {} for {}",
                response.status(),
                endpoint
            );
            return Err(err.into());
        }

        debug!("Request successful: {} {}", response.status(), endpoint);
        Ok(response)
    }

    /// Fetches one page of a user's activity listing.
    pub async fn fetch_listing(
        &self,
        access_token: &AccessToken,
        request: &PageRequest,
    ) -> Result<RedditListing<ActivityItem>, CoreError> {
        let url = self.listing_url(request)?;
        let limit = request.limit.to_string();
        let mut params = Vec::with_capacity(3);
        params.push(("limit", limit.as_str()));
        params.push(("sort", request.sort.as_str()));
        if let Some(after) = request.after.as_deref() {
            params.push(("after", after));
        }

        let response = self
            .make_request(Method::GET, url, access_token, Some(params.as_slice()))
            .await?;

        let body = response.text().await?;
        trace!("{}", body);

        let listing: RedditListing<ActivityItem> = serde_json::from_str(&body).map_err(|e| {
            error!("Failed to parse {} listing: {}", request.category, e);
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!(
                    "Failed to parse {} listing for u/{}: {}",
                    request.category, request.user, e
                ),
            })
        })?;

        debug!(
            "Retrieved {} items from u/{}/{}",
            listing.data.children.len(),
            request.user,
            request.category
        );
        Ok(listing)
    }

    pub async fn get_rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.get_rate_limit_status().await
    }
}

/// Maps a non-success status to the matching API error.
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<u64>,
    endpoint: &str,
) -> Option<RedditApiError> {
    if status.is_success() {
        return None;
    }

    let err = match status.as_u16() {
        429 => {
            let retry_after = retry_after.unwrap_or(60);
            warn!("Rate limited, retry after {} seconds", retry_after);
            RedditApiError::RateLimitExceeded { retry_after }
        }
        401 => RedditApiError::InvalidToken,
        403 => RedditApiError::Forbidden {
            resource: endpoint.to_string(),
        },
        404 => RedditApiError::NotFound {
            resource: endpoint.to_string(),
        },
        code if status.is_server_error() => RedditApiError::ServerError { status_code: code },
        code => RedditApiError::InvalidResponse {
            details: format!("Unexpected status {} for {}", code, endpoint),
        },
    };
    Some(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use history_core::{Category, SortOrder};

    fn client() -> RedditApiClient {
        RedditApiClient::new(
            "test-user-agent/1.0".to_string(),
            Url::parse("https://oauth.reddit.com").unwrap(),
            RateLimitConfig::reddit_oauth(),
        )
        .unwrap()
    }

    fn request(user: &str, category: Category) -> PageRequest {
        PageRequest {
            user: user.to_string(),
            category,
            sort: SortOrder::Top,
            limit: 100,
            after: None,
        }
    }

    #[tokio::test]
    async fn test_api_client_creation() {
        let client = client();
        assert_eq!(client.user_agent, "test-user-agent/1.0");

        let status = client.get_rate_limit_status().await;
        assert_eq!(status.requests_made, 0);
        assert_eq!(status.request_delay, Duration::from_millis(1050));
    }

    #[test]
    fn test_listing_url() {
        let url = client()
            .listing_url(&request("spez", Category::Comments))
            .unwrap();
        assert_eq!(url.as_str(), "https://oauth.reddit.com/user/spez/comments.json");
    }

    #[test]
    fn test_listing_url_escapes_user() {
        let url = client()
            .listing_url(&request("odd name?", Category::Saved))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://oauth.reddit.com/user/odd%20name%3F/saved.json"
        );
    }

    #[test]
    fn test_listing_url_with_base_path() {
        let client = RedditApiClient::new(
            "ua".to_string(),
            Url::parse("http://127.0.0.1:8080/mock/").unwrap(),
            RateLimitConfig::reddit_oauth(),
        )
        .unwrap();
        let url = client
            .listing_url(&request("me", Category::Overview))
            .unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8080/mock/user/me/overview.json");
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::OK, None, "/x").is_none());
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, Some(12), "/x"),
            Some(RedditApiError::RateLimitExceeded { retry_after: 12 })
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, None, "/x"),
            Some(RedditApiError::RateLimitExceeded { retry_after: 60 })
        ));
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, None, "/x"),
            Some(RedditApiError::InvalidToken)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND, None, "/user/ghost/saved.json"),
            Some(RedditApiError::NotFound { resource }) if resource == "/user/ghost/saved.json"
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, None, "/x"),
            Some(RedditApiError::ServerError { status_code: 502 })
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, None, "/x"),
            Some(RedditApiError::InvalidResponse { .. })
        ));
    }
}

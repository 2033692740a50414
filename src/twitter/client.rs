//! Twitter v2 REST client.

use std::time::Duration;

use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::{RetryConfig, TwitterConfig};
use crate::error::{Error, Result};
use crate::twitter::oauth::{OAuthSigner, percent_encode};
use crate::twitter::types::{
    ApiError, ApiResponse, ApiTweet, ApiUser, BlockRequest, BlockResponse, CreateTweetRequest,
    CreateTweetResponse, DeleteTweetResponse, DmEvent, FollowRequest, FollowResponse, MuteRequest,
    MuteResponse,
};

/// Profile fields requested on every user lookup.
const USER_FIELDS: &str = "id,name,username,description,location,url,protected,verified,created_at";

/// Tweet fields requested on every tweet lookup.
const TWEET_FIELDS: &str = "id,text,author_id,created_at,conversation_id,lang,public_metrics";

/// Fields requested on every DM event lookup.
const DM_EVENT_FIELDS: &str =
    "id,event_type,text,created_at,sender_id,dm_conversation_id,participant_ids";

/// Server-side page size ceilings.
const MAX_ROSTER_PAGE: u32 = 1000;
const MAX_TIMELINE_PAGE: u32 = 100;
const MAX_DM_PAGE: u32 = 100;

/// Rate limit information parsed from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: Option<u32>,
    pub remaining: Option<u32>,
    /// Unix timestamp when the window resets
    pub reset: Option<u64>,
}

impl RateLimit {
    fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let parse = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        };

        Self {
            limit: parse("x-rate-limit-limit"),
            remaining: parse("x-rate-limit-remaining"),
            reset: headers
                .get("x-rate-limit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok()),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }

    fn time_until_reset(&self) -> Option<Duration> {
        let reset = self.reset?;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()?
            .as_secs();

        (reset > now).then(|| Duration::from_secs(reset - now))
    }
}

/// OAuth 1.0a-signed client over the Twitter v2 REST API.
///
/// Retries transient failures with capped exponential backoff and waits out
/// rate limit windows when the server says how long.
#[derive(Debug)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    signer: OAuthSigner,
    retry: RetryConfig,
}

impl ApiClient {
    /// Create a new API client from configuration.
    pub fn new(config: &TwitterConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!("matweet/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            signer: OAuthSigner::new(config),
            retry: config.retry.clone(),
        })
    }

    #[instrument(skip(self, body), fields(endpoint))]
    async fn request<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        method: Method,
        endpoint: &str,
        params: &[(String, String)],
        body: Option<&B>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let full_url = if params.is_empty() {
            url.clone()
        } else {
            // Encode with the same RFC 3986 set the signature uses, so the
            // values the server decodes are the values that were signed.
            let query = params
                .iter()
                .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
                .collect::<Vec<_>>()
                .join("&");
            format!("{url}?{query}")
        };

        let mut delay = Duration::from_millis(self.retry.initial_delay_ms);
        let mut attempts = 0;

        loop {
            attempts += 1;
            debug!(attempt = attempts, %method, endpoint, "sending request");

            let auth_header = self.signer.sign(method.as_str(), &url, params)?;

            let mut req = self
                .http
                .request(method.clone(), &full_url)
                .header("Authorization", &auth_header);

            if let Some(b) = body {
                req = req.json(b);
            }

            match req.send().await {
                Ok(response) => match self.handle_response(response).await {
                    Ok(data) => return Ok(data),
                    Err(e) if e.is_retryable() && attempts < self.retry.max_attempts => {
                        if let Some(retry_after) = e.retry_after() {
                            delay = retry_after;
                        }
                        warn!(
                            attempt = attempts,
                            delay_ms = delay.as_millis(),
                            error = %e,
                            "retrying request"
                        );
                        tokio::time::sleep(self.jittered(delay)).await;
                        delay = self.next_delay(delay);
                    }
                    Err(e) => return Err(e),
                },
                Err(e) if (e.is_timeout() || e.is_connect()) && attempts < self.retry.max_attempts => {
                    warn!(
                        attempt = attempts,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying after connection error"
                    );
                    tokio::time::sleep(self.jittered(delay)).await;
                    delay = self.next_delay(delay);
                }
                Err(e) => return Err(Error::Http(e)),
            }
        }
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        std::cmp::min(delay * 2, Duration::from_millis(self.retry.max_delay_ms))
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if self.retry.jitter <= 0.0 {
            delay
        } else {
            delay.mul_f64(1.0 + self.retry.jitter * rand::random::<f64>())
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        let rate_limit = RateLimit::from_headers(response.headers());
        if rate_limit.is_exhausted() {
            debug!(reset = ?rate_limit.reset, "rate limit exhausted");
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::QuotaExceeded {
                retry_after: rate_limit
                    .time_until_reset()
                    .map_or(60, |d| d.as_secs()),
            });
        }

        let bytes = response.bytes().await?;

        if status.is_success() {
            return serde_json::from_slice(&bytes).map_err(Error::from);
        }

        // Non-2xx bodies use the v2 problem shape.
        #[derive(serde::Deserialize, Default)]
        struct ProblemBody {
            #[serde(default)]
            title: Option<String>,
            #[serde(default)]
            detail: Option<String>,
            #[serde(default)]
            errors: Option<Vec<ApiError>>,
        }

        let problem: ProblemBody = serde_json::from_slice(&bytes).unwrap_or_default();

        let message = problem
            .errors
            .filter(|errs| !errs.is_empty())
            .map(|errs| {
                errs.into_iter()
                    .filter_map(|e| e.detail.or(e.title))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .or(problem.detail)
            .or(problem.title)
            .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());

        Err(Error::from_status(
            status.as_u16(),
            message,
            rate_limit.time_until_reset().map(|d| d.as_secs()),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // User endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the authenticated user.
    pub async fn get_me(&self) -> Result<ApiResponse<ApiUser>> {
        let params = user_field_params();
        self.request(Method::GET, "/2/users/me", &params, None::<&()>)
            .await
    }

    /// Get a user by ID.
    pub async fn get_user_by_id(&self, user_id: &str) -> Result<ApiResponse<ApiUser>> {
        let params = user_field_params();
        self.request(
            Method::GET,
            &format!("/2/users/{user_id}"),
            &params,
            None::<&()>,
        )
        .await
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<ApiResponse<ApiUser>> {
        let params = user_field_params();
        self.request(
            Method::GET,
            &format!("/2/users/by/username/{username}"),
            &params,
            None::<&()>,
        )
        .await
    }

    /// Follow a user on behalf of `source_id`.
    pub async fn follow(&self, source_id: &str, target_id: &str) -> Result<FollowResponse> {
        self.request(
            Method::POST,
            &format!("/2/users/{source_id}/following"),
            &[],
            Some(&FollowRequest {
                target_user_id: target_id.to_string(),
            }),
        )
        .await
    }

    /// Unfollow a user on behalf of `source_id`.
    pub async fn unfollow(&self, source_id: &str, target_id: &str) -> Result<FollowResponse> {
        self.request(
            Method::DELETE,
            &format!("/2/users/{source_id}/following/{target_id}"),
            &[],
            None::<&()>,
        )
        .await
    }

    /// Block a user on behalf of `source_id`.
    pub async fn block(&self, source_id: &str, target_id: &str) -> Result<BlockResponse> {
        self.request(
            Method::POST,
            &format!("/2/users/{source_id}/blocking"),
            &[],
            Some(&BlockRequest {
                target_user_id: target_id.to_string(),
            }),
        )
        .await
    }

    /// Unblock a user on behalf of `source_id`.
    pub async fn unblock(&self, source_id: &str, target_id: &str) -> Result<BlockResponse> {
        self.request(
            Method::DELETE,
            &format!("/2/users/{source_id}/blocking/{target_id}"),
            &[],
            None::<&()>,
        )
        .await
    }

    /// Mute a user on behalf of `source_id`.
    pub async fn mute(&self, source_id: &str, target_id: &str) -> Result<MuteResponse> {
        self.request(
            Method::POST,
            &format!("/2/users/{source_id}/muting"),
            &[],
            Some(&MuteRequest {
                target_user_id: target_id.to_string(),
            }),
        )
        .await
    }

    /// Unmute a user on behalf of `source_id`.
    pub async fn unmute(&self, source_id: &str, target_id: &str) -> Result<MuteResponse> {
        self.request(
            Method::DELETE,
            &format!("/2/users/{source_id}/muting/{target_id}"),
            &[],
            None::<&()>,
        )
        .await
    }

    /// One page of a user's followers.
    pub async fn followers_page(
        &self,
        user_id: &str,
        page_size: u32,
        pagination_token: Option<&str>,
    ) -> Result<ApiResponse<Vec<ApiUser>>> {
        self.roster_page(&format!("/2/users/{user_id}/followers"), page_size, pagination_token)
            .await
    }

    /// One page of the users a user follows.
    pub async fn following_page(
        &self,
        user_id: &str,
        page_size: u32,
        pagination_token: Option<&str>,
    ) -> Result<ApiResponse<Vec<ApiUser>>> {
        self.roster_page(&format!("/2/users/{user_id}/following"), page_size, pagination_token)
            .await
    }

    /// One page of the users blocked by `user_id`.
    pub async fn blocked_page(
        &self,
        user_id: &str,
        page_size: u32,
        pagination_token: Option<&str>,
    ) -> Result<ApiResponse<Vec<ApiUser>>> {
        self.roster_page(&format!("/2/users/{user_id}/blocking"), page_size, pagination_token)
            .await
    }

    /// One page of the users muted by `user_id`.
    pub async fn muted_page(
        &self,
        user_id: &str,
        page_size: u32,
        pagination_token: Option<&str>,
    ) -> Result<ApiResponse<Vec<ApiUser>>> {
        self.roster_page(&format!("/2/users/{user_id}/muting"), page_size, pagination_token)
            .await
    }

    async fn roster_page(
        &self,
        endpoint: &str,
        page_size: u32,
        pagination_token: Option<&str>,
    ) -> Result<ApiResponse<Vec<ApiUser>>> {
        let mut params = user_field_params();
        params.push((
            "max_results".to_string(),
            page_size.min(MAX_ROSTER_PAGE).to_string(),
        ));
        if let Some(token) = pagination_token {
            params.push(("pagination_token".to_string(), token.to_string()));
        }

        self.request(Method::GET, endpoint, &params, None::<&()>)
            .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tweet endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// Get a tweet by ID, with the author expanded.
    pub async fn get_tweet(&self, tweet_id: &str) -> Result<ApiResponse<ApiTweet>> {
        let params = vec![
            ("tweet.fields".to_string(), TWEET_FIELDS.to_string()),
            ("expansions".to_string(), "author_id".to_string()),
            ("user.fields".to_string(), USER_FIELDS.to_string()),
        ];
        self.request(
            Method::GET,
            &format!("/2/tweets/{tweet_id}"),
            &params,
            None::<&()>,
        )
        .await
    }

    /// Create a new tweet.
    pub async fn create_tweet(&self, request: &CreateTweetRequest) -> Result<CreateTweetResponse> {
        self.request(Method::POST, "/2/tweets", &[], Some(request))
            .await
    }

    /// Delete a tweet.
    pub async fn delete_tweet(&self, tweet_id: &str) -> Result<DeleteTweetResponse> {
        self.request(
            Method::DELETE,
            &format!("/2/tweets/{tweet_id}"),
            &[],
            None::<&()>,
        )
        .await
    }

    /// One page of a user's timeline.
    pub async fn user_tweets_page(
        &self,
        user_id: &str,
        page_size: u32,
        pagination_token: Option<&str>,
    ) -> Result<ApiResponse<Vec<ApiTweet>>> {
        let mut params = vec![
            ("tweet.fields".to_string(), TWEET_FIELDS.to_string()),
            ("expansions".to_string(), "author_id".to_string()),
            ("user.fields".to_string(), USER_FIELDS.to_string()),
            (
                "max_results".to_string(),
                page_size.min(MAX_TIMELINE_PAGE).to_string(),
            ),
        ];
        if let Some(token) = pagination_token {
            params.push(("pagination_token".to_string(), token.to_string()));
        }

        self.request(
            Method::GET,
            &format!("/2/users/{user_id}/tweets"),
            &params,
            None::<&()>,
        )
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Direct message endpoints
    // ─────────────────────────────────────────────────────────────────────────

    /// One page of the authenticated user's DM events.
    pub async fn dm_events_page(
        &self,
        page_size: u32,
        pagination_token: Option<&str>,
    ) -> Result<ApiResponse<Vec<DmEvent>>> {
        let mut params = vec![
            ("dm_event.fields".to_string(), DM_EVENT_FIELDS.to_string()),
            (
                "max_results".to_string(),
                page_size.min(MAX_DM_PAGE).to_string(),
            ),
        ];
        if let Some(token) = pagination_token {
            params.push(("pagination_token".to_string(), token.to_string()));
        }

        self.request(Method::GET, "/2/dm_events", &params, None::<&()>)
            .await
    }

    /// Get a single DM event by ID.
    pub async fn get_dm_event(&self, dm_event_id: &str) -> Result<ApiResponse<DmEvent>> {
        let params = vec![("dm_event.fields".to_string(), DM_EVENT_FIELDS.to_string())];
        self.request(
            Method::GET,
            &format!("/2/dm_events/{dm_event_id}"),
            &params,
            None::<&()>,
        )
        .await
    }
}

fn user_field_params() -> Vec<(String, String)> {
    vec![("user.fields".to_string(), USER_FIELDS.to_string())]
}

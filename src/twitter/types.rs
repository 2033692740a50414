//! Twitter API v2 wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{PostMetrics, User};

/// Standard Twitter API v2 response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// The primary data
    #[serde(default = "none")]
    pub data: Option<T>,

    /// Included expansions
    #[serde(default)]
    pub includes: Option<Includes>,

    /// Pagination metadata
    #[serde(default)]
    pub meta: Option<ResponseMeta>,

    /// Partial failures
    #[serde(default)]
    pub errors: Option<Vec<ApiError>>,
}

// `#[serde(default)]` on a generic field would require `T: Default`.
const fn none<T>() -> Option<T> {
    None
}

/// Expanded objects referenced by the primary data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Includes {
    #[serde(default)]
    pub users: Vec<ApiUser>,

    #[serde(default)]
    pub tweets: Vec<ApiTweet>,
}

/// Pagination metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    #[serde(default)]
    pub result_count: Option<u32>,

    #[serde(default)]
    pub next_token: Option<String>,

    #[serde(default)]
    pub previous_token: Option<String>,
}

/// Error object attached to an otherwise successful response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub detail: Option<String>,

    #[serde(default, rename = "type")]
    pub error_type: Option<String>,

    #[serde(default)]
    pub resource_id: Option<String>,
}

/// User object as returned by the v2 API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiUser {
    pub id: String,

    /// Display name
    pub name: String,

    /// Handle without `@`
    pub username: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub protected: Option<bool>,

    #[serde(default)]
    pub verified: Option<bool>,

    #[serde(default)]
    pub created_at: Option<String>,
}

impl ApiUser {
    /// Map to the service-agnostic user model.
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            full_name: self.name,
            username: self.username,
            description: self.description,
            location: self.location,
            url: self.url,
            is_private: self.protected.unwrap_or(false),
        }
    }
}

/// Tweet object as returned by the v2 API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiTweet {
    pub id: String,

    pub text: String,

    #[serde(default)]
    pub author_id: Option<String>,

    /// ISO 8601 timestamp
    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub conversation_id: Option<String>,

    #[serde(default)]
    pub lang: Option<String>,

    #[serde(default)]
    pub public_metrics: Option<TweetMetrics>,
}

/// Public engagement counters on a tweet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetMetrics {
    pub retweet_count: u64,
    pub reply_count: u64,
    pub like_count: u64,
    pub quote_count: u64,
}

impl From<TweetMetrics> for PostMetrics {
    fn from(m: TweetMetrics) -> Self {
        Self {
            likes: m.like_count,
            reposts: m.retweet_count,
            replies: m.reply_count,
            quotes: m.quote_count,
        }
    }
}

/// Parse a v2 ISO 8601 timestamp, tolerating absent or malformed values.
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Create tweet request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTweetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<TweetReply>,
}

/// Reply target for a new tweet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TweetReply {
    pub in_reply_to_tweet_id: String,
}

/// Create tweet response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTweetResponse {
    pub data: CreatedTweet,
}

/// Created tweet data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedTweet {
    pub id: String,
    pub text: String,
}

/// Delete tweet response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteTweetResponse {
    pub data: DeletedTweet,
}

/// Deletion data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedTweet {
    pub deleted: bool,
}

/// Follow request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowRequest {
    pub target_user_id: String,
}

/// Follow state change response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowResponse {
    pub data: FollowData,
}

/// Follow state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowData {
    pub following: bool,

    #[serde(default)]
    pub pending_follow: Option<bool>,
}

/// Block request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRequest {
    pub target_user_id: String,
}

/// Block state change response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockResponse {
    pub data: BlockData,
}

/// Block state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockData {
    pub blocking: bool,
}

/// Mute request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuteRequest {
    pub target_user_id: String,
}

/// Mute state change response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuteResponse {
    pub data: MuteData,
}

/// Mute state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuteData {
    pub muting: bool,
}

/// Direct message event as returned by the v2 API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmEvent {
    pub id: String,

    /// `MessageCreate`, `ParticipantsJoin`, `ParticipantsLeave`
    #[serde(default)]
    pub event_type: Option<String>,

    #[serde(default)]
    pub text: Option<String>,

    /// ISO 8601 timestamp
    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub sender_id: Option<String>,

    /// `<id>-<id>` for one-to-one conversations
    #[serde(default)]
    pub dm_conversation_id: Option<String>,

    /// Only present for group conversations
    #[serde(default)]
    pub participant_ids: Option<Vec<String>>,
}

//! Service-agnostic domain model.
//!
//! Backends map their wire formats into these types so callers never touch
//! service-specific payloads.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A microblog service account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Service-assigned identifier
    pub id: String,

    /// Display name
    pub full_name: String,

    /// Handle, without any leading `@`
    pub username: String,

    /// Profile bio
    #[serde(default)]
    pub description: Option<String>,

    /// Free-form location
    #[serde(default)]
    pub location: Option<String>,

    /// Profile URL
    #[serde(default)]
    pub url: Option<String>,

    /// Whether the account is private/protected
    #[serde(default)]
    pub is_private: bool,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{} ({})", self.username, self.full_name)
    }
}

/// A published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Service-assigned identifier
    pub id: String,

    /// Post text
    pub text: String,

    /// Author account ID, when the service includes it
    #[serde(default)]
    pub author_id: Option<String>,

    /// Resolved author profile, when expansions were requested
    #[serde(default)]
    pub author: Option<User>,

    /// Publication time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    /// Post language (BCP47), when detected
    #[serde(default)]
    pub language: Option<String>,

    /// Public engagement counters
    #[serde(default)]
    pub metrics: Option<PostMetrics>,
}

/// Public engagement counters for a post.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostMetrics {
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
    pub quotes: u64,
}

/// A direct message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// Service-assigned identifier
    pub id: String,

    /// Sending account
    pub sender: User,

    /// Receiving accounts
    pub recipients: Vec<User>,

    /// Message text
    pub text: String,

    /// When the message was sent
    pub created_at: DateTime<Utc>,

    /// Read state; `None` when the service does not expose it
    #[serde(default)]
    pub read: Option<bool>,
}

impl fmt::Display for DirectMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let to: Vec<String> = self
            .recipients
            .iter()
            .map(|u| format!("@{}", u.username))
            .collect();
        write!(f, "@{} to {}", self.sender.username, to.join(", "))
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,

    /// Continuation token for the next page, `None` on the last page
    pub next_token: Option<String>,
}

/// A microblogging service backend.
#[async_trait]
pub trait Microblog {
    /// Stable machine identifier of the service.
    const ID: &'static str;

    /// Human-readable service name.
    const NAME: &'static str;

    /// Service homepage.
    const URL: &'static str;

    /// Fetch the authenticated account's profile.
    async fn current_user(&self) -> Result<User>;
}

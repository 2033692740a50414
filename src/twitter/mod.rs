//! Twitter backend.
//!
//! Entry point is [`Twitter`], which owns the signed API client and the
//! shared caches; the `users()`, `posts()` and `dms()` accessors hand out
//! cheap facade handles over the same shared state.

mod client;
mod dms;
mod oauth;
mod posts;
mod types;
mod users;

pub use dms::TwitterDms;
pub use posts::TwitterPosts;
pub use users::TwitterUsers;

use std::sync::Arc;

use async_trait::async_trait;

use crate::cache::TtlCache;
use crate::config::TwitterConfig;
use crate::error::Result;
use crate::model::{Microblog, User};
use client::ApiClient;

/// Upper bound on cached entries per cache.
const CACHE_CAPACITY: usize = 1024;

/// Cache key for single-profile lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum UserKey {
    /// The authenticated user
    Me,
    Id(String),
    /// Lowercased handle without `@`
    Username(String),
}

/// Cache key for roster listings, scoped to the subject user's ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RosterKey {
    Followers(String),
    Following(String),
    Blocked(String),
    Muted(String),
}

/// State shared by all facade handles.
#[derive(Debug)]
pub(crate) struct Shared {
    pub client: ApiClient,
    pub config: TwitterConfig,
    pub users: TtlCache<UserKey, User>,
    pub rosters: TtlCache<RosterKey, Vec<User>>,
}

/// The Twitter microblog service.
#[derive(Debug)]
pub struct Twitter {
    shared: Arc<Shared>,
}

impl Twitter {
    /// Create a new service handle from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Config`] if a required credential is missing,
    /// or [`crate::Error::Http`] if the HTTP client cannot be built.
    pub fn new(config: TwitterConfig) -> Result<Self> {
        config.validate()?;

        let client = ApiClient::new(&config)?;
        let shared = Shared {
            client,
            users: TtlCache::new(config.cache_ttl, CACHE_CAPACITY),
            rosters: TtlCache::new(config.cache_ttl, CACHE_CAPACITY),
            config,
        };

        Ok(Self {
            shared: Arc::new(shared),
        })
    }

    /// User profile and relationship operations.
    #[must_use]
    pub fn users(&self) -> TwitterUsers {
        TwitterUsers::new(self.shared.clone())
    }

    /// Post operations.
    #[must_use]
    pub fn posts(&self) -> TwitterPosts {
        TwitterPosts::new(self.shared.clone())
    }

    /// Direct message operations.
    #[must_use]
    pub fn dms(&self) -> TwitterDms {
        TwitterDms::new(self.shared.clone())
    }
}

#[async_trait]
impl Microblog for Twitter {
    const ID: &'static str = "twitter";
    const NAME: &'static str = "Twitter";
    const URL: &'static str = "https://twitter.com";

    async fn current_user(&self) -> Result<User> {
        self.users().current_user().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_new_rejects_missing_credentials() {
        let config = TwitterConfig {
            consumer_key: "ck".into(),
            ..Default::default()
        };

        let err = Twitter::new(config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_service_metadata() {
        assert_eq!(<Twitter as Microblog>::ID, "twitter");
        assert_eq!(<Twitter as Microblog>::NAME, "Twitter");
        assert_eq!(<Twitter as Microblog>::URL, "https://twitter.com");
    }
}

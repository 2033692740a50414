//! matweet — a microblogging client library for the Twitter/X API.
//!
//! The crate exposes a small service-agnostic domain model (users, posts,
//! direct messages) and one backend, [`Twitter`], built on the v2 REST API
//! with OAuth 1.0a user-context authentication.
//!
//! Read endpoints that are expensive to hit repeatedly (profile lookups,
//! follower/following rosters, block and mute lists) are cached in memory
//! with a configurable TTL. Mutations invalidate the rosters they affect.
//!
//! ```no_run
//! use matweet::{Twitter, TwitterConfig};
//!
//! # async fn run() -> matweet::Result<()> {
//! let twitter = Twitter::new(TwitterConfig::from_env()?)?;
//! let me = twitter.users().current_user().await?;
//! println!("logged in as @{}", me.username);
//! twitter.posts().create("hello from matweet").await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

mod cache;
mod config;
mod error;
mod model;
mod twitter;

pub use cache::TtlCache;
pub use config::{RetryConfig, TwitterConfig};
pub use error::{Error, Result};
pub use model::{DirectMessage, Microblog, Page, Post, PostMetrics, User};
pub use twitter::{Twitter, TwitterDms, TwitterPosts, TwitterUsers};

//! Post operations.

use std::sync::Arc;

use tracing::instrument;

use crate::error::{Error, Result};
use crate::model::{Page, Post};
use crate::twitter::types::{
    ApiTweet, ApiUser, CreateTweetRequest, Includes, TweetReply, parse_timestamp,
};
use crate::twitter::{Shared, users::TwitterUsers};

/// Maximum post length in characters.
pub const MAX_POST_CHARS: usize = 280;

/// Facade for post operations. Posts are not cached.
pub struct TwitterPosts {
    shared: Arc<Shared>,
    users: TwitterUsers,
}

impl TwitterPosts {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self {
            users: TwitterUsers::new(shared.clone()),
            shared,
        }
    }

    /// Get a post by ID, with its author resolved.
    pub async fn get(&self, post_id: &str) -> Result<Post> {
        let response = self.shared.client.get_tweet(post_id).await?;
        let includes = response.includes.unwrap_or_default();
        let tweet = response
            .data
            .ok_or_else(|| Error::InvalidResponse("post lookup returned no data".into()))?;

        Ok(map_tweet(tweet, &includes))
    }

    /// Publish a new post.
    #[instrument(skip(self, text))]
    pub async fn create(&self, text: &str) -> Result<Post> {
        self.publish(text, None).await
    }

    /// Publish a reply to an existing post.
    #[instrument(skip(self, text))]
    pub async fn reply(&self, text: &str, post_id: &str) -> Result<Post> {
        self.publish(text, Some(post_id)).await
    }

    async fn publish(&self, text: &str, reply_to: Option<&str>) -> Result<Post> {
        let chars = text.chars().count();
        if chars > MAX_POST_CHARS {
            return Err(Error::InvalidRequest(format!(
                "post is {chars} characters, limit is {MAX_POST_CHARS}"
            )));
        }

        let request = CreateTweetRequest {
            text: Some(text.to_string()),
            reply: reply_to.map(|id| TweetReply {
                in_reply_to_tweet_id: id.to_string(),
            }),
        };

        let response = self.shared.client.create_tweet(&request).await?;

        Ok(Post {
            id: response.data.id,
            text: response.data.text,
            author_id: None,
            author: None,
            created_at: None,
            language: None,
            metrics: None,
        })
    }

    /// Delete a post. Returns whether the server deleted it.
    #[instrument(skip(self))]
    pub async fn delete(&self, post_id: &str) -> Result<bool> {
        let response = self.shared.client.delete_tweet(post_id).await?;
        Ok(response.data.deleted)
    }

    /// One page of a user's recent posts, newest first. `None` means the
    /// current user; pass the returned token back to continue.
    pub async fn timeline(
        &self,
        username: Option<&str>,
        page_token: Option<&str>,
    ) -> Result<Page<Post>> {
        let subject = match username {
            Some(name) => self.users.get_user(name).await?,
            None => self.users.current_user().await?,
        };

        let response = self
            .shared
            .client
            .user_tweets_page(&subject.id, self.shared.config.page_size, page_token)
            .await?;

        let includes = response.includes.unwrap_or_default();
        let items = response
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|tweet| map_tweet(tweet, &includes))
            .collect();

        Ok(Page {
            items,
            next_token: response.meta.and_then(|m| m.next_token),
        })
    }
}

fn map_tweet(tweet: ApiTweet, includes: &Includes) -> Post {
    let author = tweet
        .author_id
        .as_ref()
        .and_then(|id| includes.users.iter().find(|u| &u.id == id))
        .cloned()
        .map(ApiUser::into_user);

    Post {
        author,
        author_id: tweet.author_id,
        id: tweet.id,
        text: tweet.text,
        created_at: parse_timestamp(tweet.created_at.as_deref()),
        language: tweet.lang,
        metrics: tweet.public_metrics.map(Into::into),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetryConfig, TwitterConfig};
    use crate::twitter::Twitter;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path},
    };

    fn test_service(mock_server: &MockServer) -> Twitter {
        Twitter::new(TwitterConfig {
            consumer_key: "test_consumer_key".into(),
            consumer_secret: "test_consumer_secret".into(),
            access_token: "test_access_token".into(),
            access_token_secret: "test_access_token_secret".into(),
            api_url: mock_server.uri(),
            retry: RetryConfig {
                max_attempts: 1,
                initial_delay_ms: 10,
                max_delay_ms: 100,
                jitter: 0.0,
            },
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(body_json(serde_json::json!({"text": "Hello, Twitter!"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "1234567890", "text": "Hello, Twitter!"}
            })))
            .mount(&mock_server)
            .await;

        let posts = test_service(&mock_server).posts();

        let post = posts.create("Hello, Twitter!").await.unwrap();
        assert_eq!(post.id, "1234567890");
        assert_eq!(post.text, "Hello, Twitter!");
    }

    #[tokio::test]
    async fn test_create_rejects_long_text_locally() {
        let mock_server = MockServer::start().await;
        let posts = test_service(&mock_server).posts();

        let text = "a".repeat(MAX_POST_CHARS + 1);
        let err = posts.create(&text).await.unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        // No mock mounted: the request never left the process.
    }

    #[tokio::test]
    async fn test_reply_carries_parent_id() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets"))
            .and(body_json(serde_json::json!({
                "text": "agreed",
                "reply": {"in_reply_to_tweet_id": "42"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": {"id": "43", "text": "agreed"}
            })))
            .mount(&mock_server)
            .await;

        let posts = test_service(&mock_server).posts();

        let post = posts.reply("agreed", "42").await.unwrap();
        assert_eq!(post.id, "43");
    }

    #[tokio::test]
    async fn test_get_resolves_author_from_includes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "id": "42",
                    "text": "hello world",
                    "author_id": "100",
                    "created_at": "2023-04-01T12:30:00.000Z",
                    "lang": "en",
                    "public_metrics": {
                        "retweet_count": 2,
                        "reply_count": 1,
                        "like_count": 10,
                        "quote_count": 0
                    }
                },
                "includes": {
                    "users": [{"id": "100", "name": "Ada Lovelace", "username": "ada"}]
                }
            })))
            .mount(&mock_server)
            .await;

        let posts = test_service(&mock_server).posts();

        let post = posts.get("42").await.unwrap();
        assert_eq!(post.text, "hello world");
        assert_eq!(post.author.as_ref().unwrap().username, "ada");
        assert_eq!(post.created_at.unwrap().to_rfc3339(), "2023-04-01T12:30:00+00:00");
        assert_eq!(post.metrics.as_ref().unwrap().likes, 10);
        assert_eq!(post.metrics.as_ref().unwrap().reposts, 2);
    }

    #[tokio::test]
    async fn test_timeline_returns_continuation_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"id": "1", "name": "Me", "username": "me"}
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/1/tweets"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"id": "10", "text": "newest"},
                    {"id": "9", "text": "older"}
                ],
                "meta": {"result_count": 2, "next_token": "page2"}
            })))
            .mount(&mock_server)
            .await;

        let posts = test_service(&mock_server).posts();

        let page = posts.timeline(None, None).await.unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].text, "newest");
        assert_eq!(page.next_token.as_deref(), Some("page2"));
    }
}

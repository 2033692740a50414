//! User profile and relationship operations.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::model::User;
use crate::twitter::types::ApiUser;
use crate::twitter::{RosterKey, Shared, UserKey};

/// Which roster listing to page through.
#[derive(Debug, Clone, Copy)]
enum Roster {
    Followers,
    Following,
    Blocked,
    Muted,
}

/// Facade for user operations.
///
/// Profile lookups and roster listings are cached for the configured TTL;
/// relationship mutations invalidate the roster they change.
pub struct TwitterUsers {
    shared: Arc<Shared>,
}

impl TwitterUsers {
    pub(crate) fn new(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Get the authenticated user's profile. Cached.
    pub async fn current_user(&self) -> Result<User> {
        self.lookup(UserKey::Me).await
    }

    /// Get a user's profile by handle. A leading `@` is ignored. Cached.
    pub async fn get_user(&self, username: &str) -> Result<User> {
        let handle = username.trim_start_matches('@').to_lowercase();
        self.lookup(UserKey::Username(handle)).await
    }

    /// Get a user's profile by ID. Cached.
    pub async fn get_user_by_id(&self, user_id: &str) -> Result<User> {
        self.lookup(UserKey::Id(user_id.to_string())).await
    }

    async fn lookup(&self, key: UserKey) -> Result<User> {
        if let Some(user) = self.shared.users.get(&key) {
            debug!(?key, "user lookup served from cache");
            return Ok(user);
        }

        let response = match &key {
            UserKey::Me => self.shared.client.get_me().await?,
            UserKey::Id(id) => self.shared.client.get_user_by_id(id).await?,
            UserKey::Username(handle) => self.shared.client.get_user_by_username(handle).await?,
        };

        let user = response
            .data
            .ok_or_else(|| Error::InvalidResponse("user lookup returned no data".into()))?
            .into_user();

        // Prime every key form so id and username lookups hit the same entry.
        self.shared
            .users
            .insert(UserKey::Id(user.id.clone()), user.clone());
        self.shared
            .users
            .insert(UserKey::Username(user.username.to_lowercase()), user.clone());
        if matches!(key, UserKey::Me) {
            self.shared.users.insert(UserKey::Me, user.clone());
        }

        Ok(user)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Relationship mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Follow a user. Returns the followed user's profile.
    #[instrument(skip(self))]
    pub async fn follow(&self, username: &str) -> Result<User> {
        let target = self.get_user(username).await?;
        let me = self.current_user().await?;

        let response = self.shared.client.follow(&me.id, &target.id).await?;
        if response.data.pending_follow == Some(true) {
            debug!(target = %target.username, "follow pending approval");
        }

        self.shared.rosters.invalidate(&RosterKey::Following(me.id));
        Ok(target)
    }

    /// Unfollow a user. Returns the unfollowed user's profile.
    #[instrument(skip(self))]
    pub async fn unfollow(&self, username: &str) -> Result<User> {
        let target = self.get_user(username).await?;
        let me = self.current_user().await?;

        self.shared.client.unfollow(&me.id, &target.id).await?;

        self.shared.rosters.invalidate(&RosterKey::Following(me.id));
        Ok(target)
    }

    /// Block a user. Returns the blocked user's profile.
    #[instrument(skip(self))]
    pub async fn block(&self, username: &str) -> Result<User> {
        let target = self.get_user(username).await?;
        let me = self.current_user().await?;

        self.shared.client.block(&me.id, &target.id).await?;

        self.shared.rosters.invalidate(&RosterKey::Blocked(me.id));
        Ok(target)
    }

    /// Unblock a user. Returns the unblocked user's profile.
    #[instrument(skip(self))]
    pub async fn unblock(&self, username: &str) -> Result<User> {
        let target = self.get_user(username).await?;
        let me = self.current_user().await?;

        self.shared.client.unblock(&me.id, &target.id).await?;

        self.shared.rosters.invalidate(&RosterKey::Blocked(me.id));
        Ok(target)
    }

    /// Mute a user. Returns the muted user's profile.
    #[instrument(skip(self))]
    pub async fn mute(&self, username: &str) -> Result<User> {
        let target = self.get_user(username).await?;
        let me = self.current_user().await?;

        self.shared.client.mute(&me.id, &target.id).await?;

        self.shared.rosters.invalidate(&RosterKey::Muted(me.id));
        Ok(target)
    }

    /// Unmute a user. Returns the unmuted user's profile.
    #[instrument(skip(self))]
    pub async fn unmute(&self, username: &str) -> Result<User> {
        let target = self.get_user(username).await?;
        let me = self.current_user().await?;

        self.shared.client.unmute(&me.id, &target.id).await?;

        self.shared.rosters.invalidate(&RosterKey::Muted(me.id));
        Ok(target)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Roster listings
    // ─────────────────────────────────────────────────────────────────────────

    /// List the followers of the given user, or of the current user when
    /// `username` is `None`. Paginates to completion. Cached.
    pub async fn list_followers(&self, username: Option<&str>) -> Result<Vec<User>> {
        let subject = self.subject(username).await?;
        self.roster(RosterKey::Followers(subject.id.clone()), Roster::Followers, &subject.id)
            .await
    }

    /// List the users followed by the given user, or by the current user when
    /// `username` is `None`. Paginates to completion. Cached.
    pub async fn list_following(&self, username: Option<&str>) -> Result<Vec<User>> {
        let subject = self.subject(username).await?;
        self.roster(RosterKey::Following(subject.id.clone()), Roster::Following, &subject.id)
            .await
    }

    /// List the users blocked by the current user. Paginates to completion. Cached.
    pub async fn list_blocked(&self) -> Result<Vec<User>> {
        let me = self.current_user().await?;
        self.roster(RosterKey::Blocked(me.id.clone()), Roster::Blocked, &me.id)
            .await
    }

    /// List the users muted by the current user. Paginates to completion. Cached.
    pub async fn list_muted(&self) -> Result<Vec<User>> {
        let me = self.current_user().await?;
        self.roster(RosterKey::Muted(me.id.clone()), Roster::Muted, &me.id)
            .await
    }

    async fn subject(&self, username: Option<&str>) -> Result<User> {
        match username {
            Some(name) => self.get_user(name).await,
            None => self.current_user().await,
        }
    }

    async fn roster(&self, key: RosterKey, roster: Roster, subject_id: &str) -> Result<Vec<User>> {
        if let Some(users) = self.shared.rosters.get(&key) {
            debug!(?key, count = users.len(), "roster served from cache");
            return Ok(users);
        }

        let page_size = self.shared.config.page_size;
        let mut items: Vec<User> = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = match roster {
                Roster::Followers => {
                    self.shared
                        .client
                        .followers_page(subject_id, page_size, token.as_deref())
                        .await?
                }
                Roster::Following => {
                    self.shared
                        .client
                        .following_page(subject_id, page_size, token.as_deref())
                        .await?
                }
                Roster::Blocked => {
                    self.shared
                        .client
                        .blocked_page(subject_id, page_size, token.as_deref())
                        .await?
                }
                Roster::Muted => {
                    self.shared
                        .client
                        .muted_page(subject_id, page_size, token.as_deref())
                        .await?
                }
            };

            items.extend(
                page.data
                    .unwrap_or_default()
                    .into_iter()
                    .map(ApiUser::into_user),
            );

            token = page.meta.and_then(|m| m.next_token);
            if token.is_none() {
                break;
            }
        }

        self.shared.rosters.insert(key, items.clone());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{RetryConfig, TwitterConfig};
    use crate::twitter::Twitter;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, method, path, query_param},
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

    fn user_json(id: &str, name: &str, username: &str) -> serde_json::Value {
        serde_json::json!({"id": id, "name": name, "username": username})
    }

    #[tokio::test]
    async fn test_get_user_strips_at_and_caches() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/by/username/ada"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": user_json("100", "Ada Lovelace", "ada")
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let users = test_service(&mock_server).users();

        let first = users.get_user("@ada").await.unwrap();
        assert_eq!(first.id, "100");
        assert_eq!(first.full_name, "Ada Lovelace");

        // Second lookup is served from the cache; so is lookup by ID,
        // because the fetch primed both key forms.
        let second = users.get_user("ada").await.unwrap();
        assert_eq!(second, first);
        let by_id = users.get_user_by_id("100").await.unwrap();
        assert_eq!(by_id, first);
    }

    #[tokio::test]
    async fn test_follow_returns_target_profile() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": user_json("1", "Me", "me")
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/by/username/bob"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": user_json("2", "Bob", "bob")
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/users/1/following"))
            .and(body_json(serde_json::json!({"target_user_id": "2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"following": true, "pending_follow": false}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let users = test_service(&mock_server).users();

        let followed = users.follow("bob").await.unwrap();
        assert_eq!(followed.id, "2");
        assert_eq!(followed.username, "bob");
    }

    #[tokio::test]
    async fn test_list_followers_paginates_and_caches() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": user_json("1", "Me", "me")
            })))
            .mount(&mock_server)
            .await;

        // More specific mock first: the second page.
        Mock::given(method("GET"))
            .and(path("/2/users/1/followers"))
            .and(query_param("pagination_token", "page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [user_json("3", "Carol", "carol")],
                "meta": {"result_count": 1}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/1/followers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [user_json("2", "Bob", "bob")],
                "meta": {"result_count": 1, "next_token": "page2"}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let users = test_service(&mock_server).users();

        let followers = users.list_followers(None).await.unwrap();
        assert_eq!(followers.len(), 2);
        assert_eq!(followers[0].username, "bob");
        assert_eq!(followers[1].username, "carol");

        // Cached: the expect(1) counters verify no extra upstream hits.
        let again = users.list_followers(None).await.unwrap();
        assert_eq!(again, followers);
    }

    #[tokio::test]
    async fn test_block_invalidates_blocked_roster() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": user_json("1", "Me", "me")
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/by/username/bob"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": user_json("2", "Bob", "bob")
            })))
            .mount(&mock_server)
            .await;

        // The listing must be fetched twice: once before the block, once
        // after the mutation invalidated the cached roster.
        Mock::given(method("GET"))
            .and(path("/2/users/1/blocking"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [],
                "meta": {"result_count": 0}
            })))
            .expect(2)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/2/users/1/blocking"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"blocking": true}
            })))
            .mount(&mock_server)
            .await;

        let users = test_service(&mock_server).users();

        users.list_blocked().await.unwrap();
        users.list_blocked().await.unwrap(); // cache hit
        users.block("bob").await.unwrap();
        users.list_blocked().await.unwrap(); // refetch
    }

    #[tokio::test]
    async fn test_list_following_for_other_user() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/by/username/ada"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": user_json("100", "Ada", "ada")
            })))
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/100/following"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [user_json("2", "Bob", "bob")],
                "meta": {"result_count": 1}
            })))
            .mount(&mock_server)
            .await;

        let users = test_service(&mock_server).users();

        let following = users.list_following(Some("ada")).await.unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].username, "bob");
    }
}

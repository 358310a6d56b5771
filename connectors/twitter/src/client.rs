//! Twitter API v2 client.

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::{
    config::TwitterConfig,
    error::{TwitterError, TwitterResult},
    session::{self, Subscription},
    transport::{ReqwestTransport, Transport},
    types::{
        QueryOptions, Retweeted, StreamRule, StreamRulesResponse, StreamTweet, Tweet,
        TwitterResponse, User, VolumeStreamTweet,
    },
};

/// Bearer-token client for the Twitter API v2.
///
/// Every call, including stream connects, goes through the same
/// [`Transport`].
#[derive(Clone)]
pub struct TwitterClient {
    http: Client,
    transport: Arc<dyn Transport>,
    config: TwitterConfig,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("api_url", &self.config.api_url)
            .finish_non_exhaustive()
    }
}

fn require(value: &str, what: &str) -> TwitterResult<()> {
    if value.trim().is_empty() {
        return Err(TwitterError::InvalidArgument(format!("{what} is required")));
    }
    Ok(())
}

fn require_all(values: &[&str], what: &str) -> TwitterResult<()> {
    if values.is_empty() {
        return Err(TwitterError::InvalidArgument(format!("{what} is required")));
    }
    values.iter().try_for_each(|v| require(v, what))
}

impl TwitterClient {
    /// Create a client that talks HTTP through reqwest.
    pub fn new(config: TwitterConfig) -> TwitterResult<Self> {
        config.validate()?;

        // No client-wide timeout: it would also cut long-lived stream bodies.
        // REST calls get `config.timeout` per request.
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.timeout)
            .build()?;
        let transport = Arc::new(ReqwestTransport::new(http.clone()));

        Ok(Self {
            http,
            transport,
            config,
        })
    }

    /// Create a client on top of a custom transport.
    pub fn with_transport(
        config: TwitterConfig,
        transport: Arc<dyn Transport>,
    ) -> TwitterResult<Self> {
        config.validate()?;

        Ok(Self {
            http: Client::new(),
            transport,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &TwitterConfig {
        &self.config
    }

    fn request(&self, method: Method, url: &str, params: &[(String, String)]) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, url)
            .bearer_auth(&self.config.bearer_token);
        if !params.is_empty() {
            builder = builder.query(params);
        }
        builder
    }

    /// Execute a request and decode either the success body or the error shape.
    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> TwitterResult<T> {
        let request = builder.timeout(self.config.timeout).build()?;
        debug!(method = %request.method(), url = %request.url(), "Making Twitter API request");

        let response = self.transport.send(request).await?;
        let status = response.status;
        let headers = response.headers.clone();
        let bytes = response.collect_body().await?;

        if status.is_success() {
            serde_json::from_slice(&bytes).map_err(TwitterError::from)
        } else {
            Err(TwitterError::from_response(status, &headers, &bytes))
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> TwitterResult<T> {
        self.execute(self.request(Method::GET, url, params)).await
    }

    async fn open_stream<T>(&self, url: &str, opts: &QueryOptions) -> TwitterResult<Subscription<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let request = self.request(Method::GET, url, &opts.to_params()).build()?;
        session::open(self.transport.as_ref(), request, self.config.stream).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────────

    /// Look up users by ID.
    #[instrument(skip(self, opts))]
    pub async fn lookup_users(
        &self,
        ids: &[&str],
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<User>>> {
        require_all(ids, "user ids")?;
        let mut params = vec![("ids".to_string(), ids.join(","))];
        params.extend(opts.to_params());
        self.get(&self.config.users_url(), &params).await
    }

    /// Look up a single user by ID.
    #[instrument(skip(self, opts))]
    pub async fn lookup_user(
        &self,
        id: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<User>> {
        require(id, "user id")?;
        let url = format!("{}/{id}", self.config.users_url());
        self.get(&url, &opts.to_params()).await
    }

    /// Look up users by username.
    #[instrument(skip(self, opts))]
    pub async fn lookup_users_by_usernames(
        &self,
        usernames: &[&str],
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<User>>> {
        require_all(usernames, "usernames")?;
        let mut params = vec![("usernames".to_string(), usernames.join(","))];
        params.extend(opts.to_params());
        let url = format!("{}/by", self.config.users_url());
        self.get(&url, &params).await
    }

    /// Look up a single user by username.
    #[instrument(skip(self, opts))]
    pub async fn lookup_user_by_username(
        &self,
        username: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<User>> {
        require(username, "username")?;
        let url = format!("{}/by/username/{username}", self.config.users_url());
        self.get(&url, &opts.to_params()).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tweets and timelines
    // ─────────────────────────────────────────────────────────────────────────

    #[instrument(skip(self, opts))]
    pub async fn lookup_tweets(
        &self,
        ids: &[&str],
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<Tweet>>> {
        require_all(ids, "tweet ids")?;
        let mut params = vec![("ids".to_string(), ids.join(","))];
        params.extend(opts.to_params());
        self.get(&self.config.tweets_url(), &params).await
    }

    #[instrument(skip(self, opts))]
    pub async fn lookup_tweet(
        &self,
        id: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Tweet>> {
        require(id, "tweet id")?;
        let url = format!("{}/{id}", self.config.tweets_url());
        self.get(&url, &opts.to_params()).await
    }

    /// Tweets authored by a user, newest first.
    #[instrument(skip(self, opts))]
    pub async fn user_tweet_timeline(
        &self,
        user_id: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<Tweet>>> {
        require(user_id, "user id")?;
        let url = format!("{}/{user_id}/tweets", self.config.users_url());
        self.get(&url, &opts.to_params()).await
    }

    /// Tweets mentioning a user, newest first.
    #[instrument(skip(self, opts))]
    pub async fn user_mention_timeline(
        &self,
        user_id: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<Tweet>>> {
        require(user_id, "user id")?;
        let url = format!("{}/{user_id}/mentions", self.config.users_url());
        self.get(&url, &opts.to_params()).await
    }

    /// Search tweets from the last seven days.
    #[instrument(skip(self, opts))]
    pub async fn search_recent(
        &self,
        query: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<Tweet>>> {
        require(query, "query")?;
        let mut params = vec![("query".to_string(), query.to_string())];
        params.extend(opts.to_params());
        let url = format!("{}/search/recent", self.config.tweets_url());
        self.get(&url, &params).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Likes, retweets, follows
    // ─────────────────────────────────────────────────────────────────────────

    /// Users who liked a tweet.
    #[instrument(skip(self, opts))]
    pub async fn liking_users(
        &self,
        tweet_id: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<User>>> {
        require(tweet_id, "tweet id")?;
        let url = format!("{}/{tweet_id}/liking_users", self.config.tweets_url());
        self.get(&url, &opts.to_params()).await
    }

    /// Tweets a user has liked.
    #[instrument(skip(self, opts))]
    pub async fn liked_tweets(
        &self,
        user_id: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<Tweet>>> {
        require(user_id, "user id")?;
        let url = format!("{}/{user_id}/liked_tweets", self.config.users_url());
        self.get(&url, &opts.to_params()).await
    }

    /// Users who retweeted a tweet.
    #[instrument(skip(self, opts))]
    pub async fn retweeted_by(
        &self,
        tweet_id: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<User>>> {
        require(tweet_id, "tweet id")?;
        let url = format!("{}/{tweet_id}/retweeted_by", self.config.tweets_url());
        self.get(&url, &opts.to_params()).await
    }

    /// Retweet `tweet_id` as `user_id`.
    #[instrument(skip(self))]
    pub async fn retweet(
        &self,
        user_id: &str,
        tweet_id: &str,
    ) -> TwitterResult<TwitterResponse<Retweeted>> {
        require(user_id, "user id")?;
        require(tweet_id, "tweet id")?;

        #[derive(serde::Serialize)]
        struct RetweetRequest<'a> {
            tweet_id: &'a str,
        }

        let url = format!("{}/{user_id}/retweets", self.config.users_url());
        let builder = self
            .request(Method::POST, &url, &[])
            .json(&RetweetRequest { tweet_id });
        self.execute(builder).await
    }

    /// Undo a retweet of `source_tweet_id` by `user_id`.
    #[instrument(skip(self))]
    pub async fn undo_retweet(
        &self,
        user_id: &str,
        source_tweet_id: &str,
    ) -> TwitterResult<TwitterResponse<Retweeted>> {
        require(user_id, "user id")?;
        require(source_tweet_id, "source tweet id")?;
        let url = format!(
            "{}/{user_id}/retweets/{source_tweet_id}",
            self.config.users_url()
        );
        self.execute(self.request(Method::DELETE, &url, &[])).await
    }

    /// Users the given user follows.
    #[instrument(skip(self, opts))]
    pub async fn following(
        &self,
        user_id: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<User>>> {
        require(user_id, "user id")?;
        let url = format!("{}/{user_id}/following", self.config.users_url());
        self.get(&url, &opts.to_params()).await
    }

    /// Users following the given user.
    #[instrument(skip(self, opts))]
    pub async fn followers(
        &self,
        user_id: &str,
        opts: &QueryOptions,
    ) -> TwitterResult<TwitterResponse<Vec<User>>> {
        require(user_id, "user id")?;
        let url = format!("{}/{user_id}/followers", self.config.users_url());
        self.get(&url, &opts.to_params()).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Filtered stream rules
    // ─────────────────────────────────────────────────────────────────────────

    fn rules_url(&self) -> String {
        format!("{}/search/stream/rules", self.config.tweets_url())
    }

    /// Current filtered stream rules, optionally restricted to `ids`.
    #[instrument(skip(self))]
    pub async fn stream_rules(&self, ids: &[&str]) -> TwitterResult<StreamRulesResponse> {
        let params = if ids.is_empty() {
            Vec::new()
        } else {
            vec![("ids".to_string(), ids.join(","))]
        };
        self.get(&self.rules_url(), &params).await
    }

    /// Add filtered stream rules. With `dry_run` the rules are only validated.
    #[instrument(skip(self, rules))]
    pub async fn add_stream_rules(
        &self,
        rules: &[StreamRule],
        dry_run: bool,
    ) -> TwitterResult<StreamRulesResponse> {
        if rules.is_empty() {
            return Err(TwitterError::InvalidArgument("rules are required".into()));
        }
        rules.iter().try_for_each(|r| require(&r.value, "rule value"))?;

        #[derive(serde::Serialize)]
        struct AddRulesRequest<'a> {
            add: &'a [StreamRule],
        }

        let builder = self
            .request(Method::POST, &self.rules_url(), &dry_run_param(dry_run))
            .json(&AddRulesRequest { add: rules });
        self.execute(builder).await
    }

    /// Delete filtered stream rules by ID.
    #[instrument(skip(self))]
    pub async fn delete_stream_rules(
        &self,
        rule_ids: &[&str],
        dry_run: bool,
    ) -> TwitterResult<StreamRulesResponse> {
        require_all(rule_ids, "rule ids")?;

        #[derive(serde::Serialize)]
        struct DeleteRulesRequest<'a> {
            delete: DeleteIds<'a>,
        }

        #[derive(serde::Serialize)]
        struct DeleteIds<'a> {
            ids: &'a [&'a str],
        }

        let body = DeleteRulesRequest {
            delete: DeleteIds { ids: rule_ids },
        };
        let builder = self
            .request(Method::POST, &self.rules_url(), &dry_run_param(dry_run))
            .json(&body);
        self.execute(builder).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Streams
    // ─────────────────────────────────────────────────────────────────────────

    /// Connect to the filtered stream.
    ///
    /// Reconnecting after the subscription ends is up to the caller.
    #[instrument(skip(self, opts))]
    pub async fn filtered_stream(
        &self,
        opts: &QueryOptions,
    ) -> TwitterResult<Subscription<StreamTweet>> {
        let url = format!("{}/search/stream", self.config.tweets_url());
        self.open_stream(&url, opts).await
    }

    /// Connect to the 1% sampled (volume) stream.
    #[instrument(skip(self, opts))]
    pub async fn sample_stream(
        &self,
        opts: &QueryOptions,
    ) -> TwitterResult<Subscription<VolumeStreamTweet>> {
        let url = format!("{}/sample/stream", self.config.tweets_url());
        self.open_stream(&url, opts).await
    }
}

fn dry_run_param(dry_run: bool) -> Vec<(String, String)> {
    if dry_run {
        vec![("dry_run".to_string(), "true".to_string())]
    } else {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path, query_param},
    };

    /// Create a test config pointing to the mock server.
    fn test_config(mock_server: &MockServer) -> TwitterConfig {
        TwitterConfig::new("test_bearer_token").with_api_url(mock_server.uri())
    }

    #[tokio::test]
    async fn test_lookup_user_success() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/2244994945"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .and(query_param("user.fields", "created_at"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {
                    "id": "2244994945",
                    "name": "Twitter Dev",
                    "username": "TwitterDev",
                    "created_at": "2013-12-14T04:35:55.000Z"
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let opts = QueryOptions::new().user_fields(["created_at"]);

        let response = client.lookup_user("2244994945", &opts).await.unwrap();
        let user = response.data.unwrap();
        assert_eq!(user.username, "TwitterDev");
        assert_eq!(user.created_at.as_deref(), Some("2013-12-14T04:35:55.000Z"));
    }

    #[tokio::test]
    async fn test_lookup_users_by_usernames() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/by"))
            .and(query_param("usernames", "TwitterDev,Twitter"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "2244994945", "name": "Twitter Dev", "username": "TwitterDev" },
                    { "id": "783214", "name": "Twitter", "username": "Twitter" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let response = client
            .lookup_users_by_usernames(&["TwitterDev", "Twitter"], &QueryOptions::default())
            .await
            .unwrap();

        let users = response.data.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].id, "783214");
    }

    #[tokio::test]
    async fn test_empty_id_is_rejected_without_request() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let opts = QueryOptions::default();

        assert!(matches!(
            client.following("", &opts).await,
            Err(TwitterError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.liking_users("  ", &opts).await,
            Err(TwitterError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.lookup_tweets(&[], &opts).await,
            Err(TwitterError::InvalidArgument(_))
        ));
        assert!(matches!(
            client.retweet("123", "").await,
            Err(TwitterError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_lookup_user_by_username() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/by/username/TwitterDev"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "id": "2244994945", "name": "Twitter Dev", "username": "TwitterDev" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let response = client
            .lookup_user_by_username("TwitterDev", &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(response.data.unwrap().id, "2244994945");
    }

    #[tokio::test]
    async fn test_lookup_tweets_and_tweet() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .and(query_param("ids", "1261326399320715264,1278347468690915330"))
            .and(query_param("expansions", "author_id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "1261326399320715264", "text": "Tune in", "author_id": "2244994945" },
                    { "id": "1278347468690915330", "text": "Good news", "author_id": "783214" }
                ],
                "includes": {
                    "users": [
                        { "id": "2244994945", "name": "Twitter Dev", "username": "TwitterDev" },
                        { "id": "783214", "name": "Twitter", "username": "Twitter" }
                    ]
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/1261326399320715264"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "id": "1261326399320715264", "text": "Tune in" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let opts = QueryOptions::new().expansions(["author_id"]);

        let many = client
            .lookup_tweets(&["1261326399320715264", "1278347468690915330"], &opts)
            .await
            .unwrap();
        assert_eq!(many.data.unwrap()[1].author_id.as_deref(), Some("783214"));
        assert_eq!(many.includes.unwrap().users.len(), 2);

        let one = client
            .lookup_tweet("1261326399320715264", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(one.data.unwrap().text, "Tune in");
    }

    #[tokio::test]
    async fn test_user_timelines() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/2244994945/tweets"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .and(query_param("since_id", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "1338971066773905408", "text": "authored" }],
                "meta": { "result_count": 1 }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/2244994945/mentions"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "1375152598945312768", "text": "@TwitterDev hi" }],
                "meta": { "result_count": 1 }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let opts = QueryOptions {
            since_id: Some("1".into()),
            ..QueryOptions::default()
        };

        let authored = client.user_tweet_timeline("2244994945", &opts).await.unwrap();
        assert_eq!(authored.data.unwrap()[0].text, "authored");

        let mentions = client
            .user_mention_timeline("2244994945", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(mentions.data.unwrap()[0].id, "1375152598945312768");
    }

    #[tokio::test]
    async fn test_likes() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/1354143047324299264/liking_users"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "id": "1065249714214457345",
                    "name": "Spaces",
                    "username": "TwitterSpaces"
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/2244994945/liked_tweets"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "1362449997430542337", "text": "liked" }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let opts = QueryOptions::default();

        let users = client.liking_users("1354143047324299264", &opts).await.unwrap();
        assert_eq!(users.data.unwrap()[0].username, "TwitterSpaces");

        let tweets = client.liked_tweets("2244994945", &opts).await.unwrap();
        assert_eq!(tweets.data.unwrap()[0].id, "1362449997430542337");
    }

    #[tokio::test]
    async fn test_follows() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/2244994945/following"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{ "id": "783214", "name": "Twitter", "username": "Twitter" }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("GET"))
            .and(path("/2/users/2244994945/followers"))
            .and(header("Authorization", "Bearer test_bearer_token"))
            .and(query_param("pagination_token", "DFEDBNRFT3MHCZZZ"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{
                    "id": "1324848235714736129",
                    "name": "Follower",
                    "username": "follower"
                }],
                "meta": { "result_count": 1, "previous_token": "8FDBNRFT3MHCZZZ" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();

        let following = client
            .following("2244994945", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(following.data.unwrap()[0].username, "Twitter");

        let followers = client
            .followers(
                "2244994945",
                &QueryOptions::new().pagination_token("DFEDBNRFT3MHCZZZ"),
            )
            .await
            .unwrap();
        assert_eq!(followers.data.unwrap()[0].username, "follower");
        assert_eq!(
            followers.meta.unwrap().previous_token.as_deref(),
            Some("8FDBNRFT3MHCZZZ")
        );
    }

    #[tokio::test]
    async fn test_retweeted_by_with_pagination() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/1354143047324299264/retweeted_by"))
            .and(query_param("max_results", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "1065249714214457345", "name": "Spaces", "username": "TwitterSpaces" }
                ],
                "meta": {
                    "result_count": 1,
                    "next_token": "7140dibdnow9c7btw3w29grvxfcgvpb9n9coehpk7xz5i"
                }
            })))
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let response = client
            .retweeted_by("1354143047324299264", &QueryOptions::new().max_results(10))
            .await
            .unwrap();

        assert_eq!(response.data.unwrap()[0].username, "TwitterSpaces");
        let meta = response.meta.unwrap();
        assert_eq!(meta.result_count, Some(1));
        assert!(meta.next_token.is_some());
    }

    #[tokio::test]
    async fn test_retweet_and_undo() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/users/6253282/retweets"))
            .and(body_json(serde_json::json!({ "tweet_id": "1228393702244134912" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "retweeted": true }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/2/users/6253282/retweets/1228393702244134912"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": { "retweeted": false }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();

        let done = client.retweet("6253282", "1228393702244134912").await.unwrap();
        assert!(done.data.unwrap().retweeted);

        let undone = client
            .undo_retweet("6253282", "1228393702244134912")
            .await
            .unwrap();
        assert!(!undone.data.unwrap().retweeted);
    }

    #[tokio::test]
    async fn test_search_recent_sends_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/recent"))
            .and(query_param("query", "from:TwitterDev"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    { "id": "1234", "text": "Hello world" },
                    { "id": "5678", "text": "Test tweet" }
                ],
                "meta": { "result_count": 2, "newest_id": "1234", "oldest_id": "5678" }
            })))
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let response = client
            .search_recent("from:TwitterDev", &QueryOptions::default())
            .await
            .unwrap();

        let tweets = response.data.unwrap();
        assert_eq!(tweets.len(), 2);
        assert_eq!(tweets[0].text, "Hello world");
    }

    #[tokio::test]
    async fn test_stream_rules_forbidden() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/tweets/search/stream/rules"))
            .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
                "errors": [{
                    "client_id": "16340226",
                    "required_enrollment": "Standard Basic",
                    "registration_url": "https://developer.twitter.com/en/account",
                    "title": "Client Forbidden",
                    "detail": "This request must be made using an approved developer account that is enrolled in the requested endpoint.",
                    "reason": "client-not-enrolled",
                    "type": "https://api.twitter.com/2/problems/client-forbidden"
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let err = client.stream_rules(&[]).await.unwrap_err();

        match err {
            TwitterError::Api { status, errors, .. } => {
                assert_eq!(status, 403);
                assert_eq!(errors[0].client_id.as_deref(), Some("16340226"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_add_stream_rules_dry_run() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets/search/stream/rules"))
            .and(query_param("dry_run", "true"))
            .and(body_json(serde_json::json!({
                "add": [
                    { "value": "puppy has:media", "tag": "puppies with media" },
                    { "value": "meme has:images" }
                ]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "data": [
                    { "id": "1273636687768285186", "value": "meme has:images" },
                    {
                        "id": "1273636687768285187",
                        "value": "puppy has:media",
                        "tag": "puppies with media"
                    }
                ],
                "meta": {
                    "sent": "2020-06-18T15:21:58.638Z",
                    "summary": { "created": 2, "not_created": 0, "valid": 2, "invalid": 0 }
                }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let rules = [
            StreamRule::new("puppy has:media").with_tag("puppies with media"),
            StreamRule::new("meme has:images"),
        ];

        let response = client.add_stream_rules(&rules, true).await.unwrap();
        assert_eq!(response.data.unwrap().len(), 2);
        let summary = response.meta.unwrap().summary.unwrap();
        assert_eq!(summary.created, Some(2));
    }

    #[tokio::test]
    async fn test_delete_stream_rules() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/2/tweets/search/stream/rules"))
            .and(body_json(serde_json::json!({
                "delete": { "ids": ["1273636687768285186"] }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "meta": {
                    "sent": "2020-06-18T15:21:58.638Z",
                    "summary": { "deleted": 1, "not_deleted": 0 }
                }
            })))
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let response = client
            .delete_stream_rules(&["1273636687768285186"], false)
            .await
            .unwrap();

        assert!(response.data.is_none());
        assert_eq!(response.meta.unwrap().summary.unwrap().deleted, Some(1));
    }

    #[tokio::test]
    async fn test_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/2/users/12/followers"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("x-rate-limit-reset", "1700000000")
                    .set_body_json(serde_json::json!({
                        "title": "Too Many Requests",
                        "detail": "Too Many Requests",
                        "type": "about:blank",
                        "status": 429
                    })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = TwitterClient::new(test_config(&mock_server)).unwrap();
        let err = client
            .followers("12", &QueryOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TwitterError::RateLimited { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_new_rejects_missing_token() {
        let result = TwitterClient::new(TwitterConfig::default());
        assert!(matches!(result, Err(TwitterError::Config(_))));
    }
}

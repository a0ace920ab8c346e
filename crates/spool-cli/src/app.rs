use serde::{Deserialize, Serialize};
use spool_core::{Namespace, RecordStore};
use spool_redirector::{
    BotClassifier, RedirectError, RedirectorService, ResolveRequest, UserAgentClassifier,
};
use spool_shortener::{
    CreateLinkRequest, CreatedLink, DefaultValidator, ShortenerError, ShortenerService,
};
use tracing::{debug, warn};

/// A request the binary can serve, either from argv or as a JSON line.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Shorten(CreateParams),
    Emoji(CreateParams),
    Resolve(ResolveParams),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateParams {
    pub url: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub max_clicks: Option<u64>,
    #[serde(default)]
    pub block_bots: bool,
    #[serde(default = "default_ip")]
    pub creator_ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolveParams {
    pub code: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_ip")]
    pub client_ip: String,
}

fn default_ip() -> String {
    crate::cli::DEFAULT_CLIENT_IP.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Created {
        code: String,
        namespace: Namespace,
        short_url: String,
    },
    Redirect {
        code: String,
        target_url: String,
        total_clicks: u64,
    },
    Error {
        error: &'static str,
        message: String,
    },
}

impl Response {
    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

fn shortener_error_kind(err: &ShortenerError) -> &'static str {
    match err {
        ShortenerError::AliasTaken(_) => "alias_taken",
        ShortenerError::NamespaceExhausted { .. } => "namespace_exhausted",
        ShortenerError::InvalidUrl(_) => "invalid_url",
        ShortenerError::BlockedUrl(_) => "blocked_url",
        ShortenerError::InvalidAlias(_) => "invalid_alias",
        ShortenerError::InvalidPassword => "invalid_password",
        ShortenerError::InvalidMaxClicks => "invalid_max_clicks",
        ShortenerError::Storage(e) if e.is_transient() => "store_unavailable",
        ShortenerError::Storage(_) => "storage",
    }
}

fn redirect_error_kind(err: &RedirectError) -> &'static str {
    match err {
        RedirectError::NotFound(_) => "not_found",
        RedirectError::DenyPassword => "deny_password",
        RedirectError::DenyLimit => "deny_limit",
        RedirectError::DenyBot => "deny_bot",
        RedirectError::Storage(e) if e.is_transient() => "store_unavailable",
        RedirectError::Storage(_) => "storage",
    }
}

/// Both services wired to the same store.
pub struct App<S> {
    shortener: ShortenerService<S, DefaultValidator>,
    redirector: RedirectorService<S>,
    classifier: UserAgentClassifier,
    base_url: String,
}

impl<S: RecordStore> App<S> {
    pub fn new(
        shortener: ShortenerService<S, DefaultValidator>,
        redirector: RedirectorService<S>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            shortener,
            redirector,
            classifier: UserAgentClassifier::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        match request {
            Request::Shorten(params) => {
                let result = self.shortener.create_short_link(create_request(params)).await;
                self.created(result)
            }
            Request::Emoji(params) => {
                let result = self.shortener.create_emoji_link(create_request(params)).await;
                self.created(result)
            }
            Request::Resolve(params) => self.resolve(params).await,
        }
    }

    fn created(&self, result: Result<CreatedLink, ShortenerError>) -> Response {
        match result {
            Ok(created) => Response::Created {
                short_url: created.code.to_url(&self.base_url),
                namespace: created.namespace(),
                code: created.code.to_string(),
            },
            Err(err) => {
                warn!(error = %err, "create failed");
                Response::Error {
                    error: shortener_error_kind(&err),
                    message: err.to_string(),
                }
            }
        }
    }

    async fn resolve(&self, params: ResolveParams) -> Response {
        let bot_name = self.classifier.bot_name(params.user_agent.as_deref());
        let request = ResolveRequest {
            code: params.code,
            password: params.password,
            caller_is_bot: bot_name.is_some(),
            bot_name,
            client_ip: params.client_ip,
        };

        match self.redirector.resolve(request).await {
            Ok(redirect) => Response::Redirect {
                code: redirect.code.to_string(),
                target_url: redirect.target_url,
                total_clicks: redirect.total_clicks,
            },
            Err(err) => {
                debug!(error = %err, "resolve refused");
                Response::Error {
                    error: redirect_error_kind(&err),
                    message: err.to_string(),
                }
            }
        }
    }
}

fn create_request(params: CreateParams) -> CreateLinkRequest {
    CreateLinkRequest {
        target_url: params.url,
        alias: params.alias,
        password: params.password,
        max_clicks: params.max_clicks,
        block_bots: params.block_bots,
        creator_ip: params.creator_ip,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spool_shortener::ShortenerSettings;
    use spool_storage::InMemoryStore;
    use std::sync::Arc;

    fn app() -> App<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        App::new(
            ShortenerService::new(Arc::clone(&store), ShortenerSettings::default()),
            RedirectorService::new(store),
            "https://spoo.me",
        )
    }

    fn parse(line: &str) -> Request {
        serde_json::from_str(line).unwrap()
    }

    #[tokio::test]
    async fn shorten_then_resolve() {
        let app = app();

        let created = app
            .handle(parse(r#"{"op":"shorten","url":"https://example.com","alias":"docs"}"#))
            .await;
        assert_eq!(
            created,
            Response::Created {
                code: "docs".to_string(),
                namespace: Namespace::Alphanumeric,
                short_url: "https://spoo.me/docs".to_string(),
            }
        );

        let resolved = app
            .handle(parse(r#"{"op":"resolve","code":"docs","user_agent":"Mozilla/5.0"}"#))
            .await;
        assert_eq!(
            resolved,
            Response::Redirect {
                code: "docs".to_string(),
                target_url: "https://example.com".to_string(),
                total_clicks: 1,
            }
        );
    }

    #[tokio::test]
    async fn errors_are_reported_by_kind() {
        let app = app();

        let missing = app.handle(parse(r#"{"op":"resolve","code":"nope"}"#)).await;
        assert!(matches!(missing, Response::Error { error: "not_found", .. }));

        let invalid = app.handle(parse(r#"{"op":"shorten","url":"nope"}"#)).await;
        assert!(matches!(invalid, Response::Error { error: "invalid_url", .. }));
        assert!(invalid.is_error());
    }

    #[tokio::test]
    async fn missing_user_agent_is_treated_as_bot() {
        let app = app();
        app.handle(parse(
            r#"{"op":"emoji","url":"https://example.com","alias":"🍕","block_bots":true}"#,
        ))
        .await;

        let denied = app.handle(parse(r#"{"op":"resolve","code":"🍕"}"#)).await;
        assert!(matches!(denied, Response::Error { error: "deny_bot", .. }));

        let allowed = app
            .handle(parse(r#"{"op":"resolve","code":"%F0%9F%8D%95","user_agent":"Mozilla/5.0"}"#))
            .await;
        assert!(matches!(allowed, Response::Redirect { total_clicks: 1, .. }));
    }

    #[tokio::test]
    async fn crawler_clicks_are_attributed() {
        let app = app();
        app.handle(parse(r#"{"op":"shorten","url":"https://example.com","alias":"open"}"#))
            .await;

        let googlebot = r#"{"op":"resolve","code":"open","user_agent":"Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)"}"#;
        let resolved = app.handle(parse(googlebot)).await;
        assert!(matches!(resolved, Response::Redirect { total_clicks: 1, .. }));

        let stored = app.shortener.store().lookup_v2("open").await.unwrap().unwrap();
        assert_eq!(stored.bot_counter.get("Googlebot"), Some(&1));
    }

    #[test]
    fn responses_serialize_with_status_tag() {
        let response = Response::Error {
            error: "deny_limit",
            message: "click limit reached".to_string(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"], "deny_limit");
    }
}

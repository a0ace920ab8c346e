use woothee::parser::Parser;

/// Decides whether a request comes from an automated client.
pub trait BotClassifier: Send + Sync + 'static {
    /// Name of the bot behind `user_agent`, or `None` for a human client.
    fn bot_name(&self, user_agent: Option<&str>) -> Option<String>;

    fn is_bot(&self, user_agent: Option<&str>) -> bool {
        self.bot_name(user_agent).is_some()
    }
}

/// Bot name recorded when a client is automated but unnamed.
pub const UNKNOWN_BOT: &str = "unknown";

/// Crawler, preview and scripting user-agent fragments.
///
/// `bot` only matches when followed by `/` or `-`, as in `Twitterbot/1.0`
/// or `Slackbot-LinkExpanding`, so device names such as "Cubot" pass.
pub const DEFAULT_BOT_TOKENS: &[&str] = &[
    "bot/",
    "bot-",
    "+http",
    "crawler",
    "spider",
    "slurp",
    "scraper",
    "facebookexternalhit",
    "embedly",
    "quora link preview",
    "whatsapp",
    "telegram",
    "discord",
    "skypeuripreview",
    "bitlybot",
    "pinterest",
    "vkshare",
    "w3c_validator",
    "lighthouse",
    "headlesschrome",
    "phantomjs",
    "python-requests",
    "python-urllib",
    "aiohttp",
    "httpx",
    "curl",
    "wget",
    "go-http-client",
    "okhttp",
    "java/",
    "libwww-perl",
    "apache-httpclient",
    "postmanruntime",
    "axios",
    "node-fetch",
    "scrapy",
];

/// Classifies with woothee's crawler detection, then by case-insensitive
/// substring match against a token list.
///
/// A request without a user agent, or with a blank one, counts as a bot
/// named [`UNKNOWN_BOT`]. Token matches are named after the token.
#[derive(Debug, Clone)]
pub struct UserAgentClassifier {
    tokens: Vec<String>,
}

impl UserAgentClassifier {
    pub fn new() -> Self {
        Self::with_tokens(DEFAULT_BOT_TOKENS.iter().copied())
    }

    pub fn with_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(|token| token.into().to_lowercase())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }
}

impl Default for UserAgentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl BotClassifier for UserAgentClassifier {
    fn bot_name(&self, user_agent: Option<&str>) -> Option<String> {
        let Some(user_agent) = user_agent.map(str::trim).filter(|ua| !ua.is_empty()) else {
            return Some(UNKNOWN_BOT.to_string());
        };

        if let Some(result) = Parser::new().parse(user_agent) {
            if result.category == "crawler" {
                let name = match result.name {
                    "" | "UNKNOWN" => "crawler",
                    name => name,
                };
                return Some(name.to_string());
            }
        }

        let lowered = user_agent.to_lowercase();
        self.tokens
            .iter()
            .find(|token| lowered.contains(token.as_str()))
            .cloned()
    }
}

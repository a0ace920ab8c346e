use crate::emoji;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Maximum length of a code in the alphanumeric namespace.
pub const MAX_ALIAS_LENGTH: usize = 16;

/// One of the two disjoint code spaces uniqueness is enforced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Namespace {
    Alphanumeric,
    Emoji,
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Namespace::Alphanumeric => f.write_str("alphanumeric"),
            Namespace::Emoji => f.write_str("emoji"),
        }
    }
}

/// A short code together with the namespace it lives in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "namespace", content = "code", rename_all = "snake_case")]
pub enum ShortCode {
    Alphanumeric(String),
    Emoji(String),
}

impl ShortCode {
    /// Creates an alphanumeric code from a caller-supplied alias.
    ///
    /// Aliases may contain only `[a-zA-Z0-9_-]` and are truncated to
    /// [`MAX_ALIAS_LENGTH`] characters after validation.
    pub fn alias(alias: impl AsRef<str>) -> std::result::Result<Self, CoreError> {
        let alias = alias.as_ref();
        if alias.is_empty() {
            return Err(CoreError::InvalidShortCode(
                "alias cannot be empty".to_string(),
            ));
        }

        if !alias
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CoreError::InvalidShortCode(format!(
                "must contain only alphanumeric characters, hyphens, or underscores: '{}'",
                alias
            )));
        }

        // ASCII only at this point, so byte truncation is char truncation.
        let truncated = &alias[..alias.len().min(MAX_ALIAS_LENGTH)];
        Ok(Self::Alphanumeric(truncated.to_string()))
    }

    /// Creates an emoji code from a caller-supplied emoji alias.
    pub fn emoji(alias: impl Into<String>) -> std::result::Result<Self, CoreError> {
        let alias = alias.into();
        if !emoji::is_emoji_sequence(&alias) {
            return Err(CoreError::InvalidShortCode(format!(
                "must be 1 to {} emoji: '{}'",
                emoji::MAX_EMOJI_SYMBOLS,
                alias
            )));
        }
        Ok(Self::Emoji(alias))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (e.g. generators that are guaranteed to produce valid output).
    pub fn new_unchecked(namespace: Namespace, code: impl Into<String>) -> Self {
        match namespace {
            Namespace::Alphanumeric => Self::Alphanumeric(code.into()),
            Namespace::Emoji => Self::Emoji(code.into()),
        }
    }

    pub fn namespace(&self) -> Namespace {
        match self {
            ShortCode::Alphanumeric(_) => Namespace::Alphanumeric,
            ShortCode::Emoji(_) => Namespace::Emoji,
        }
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        match self {
            ShortCode::Alphanumeric(code) | ShortCode::Emoji(code) => code,
        }
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self)
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a record lives in the store: its namespace plus, for the
/// alphanumeric namespace, which schema version holds it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "schema", content = "code", rename_all = "snake_case")]
pub enum StoreKey {
    /// Current alphanumeric schema; the alias is a field of the document.
    V2(String),
    /// Legacy alphanumeric schema; the code is the primary key.
    Legacy(String),
    /// Emoji namespace.
    Emoji(String),
}

impl StoreKey {
    pub fn namespace(&self) -> Namespace {
        match self {
            StoreKey::V2(_) | StoreKey::Legacy(_) => Namespace::Alphanumeric,
            StoreKey::Emoji(_) => Namespace::Emoji,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            StoreKey::V2(code) | StoreKey::Legacy(code) | StoreKey::Emoji(code) => code,
        }
    }

    /// Schema label used in logs and storage keys.
    pub fn schema(&self) -> &'static str {
        match self {
            StoreKey::V2(_) => "v2",
            StoreKey::Legacy(_) => "legacy",
            StoreKey::Emoji(_) => "emoji",
        }
    }

    pub fn to_short_code(&self) -> ShortCode {
        ShortCode::new_unchecked(self.namespace(), self.code())
    }
}

impl From<&ShortCode> for StoreKey {
    /// New records are always written under the current schema.
    fn from(code: &ShortCode) -> Self {
        match code {
            ShortCode::Alphanumeric(code) => StoreKey::V2(code.clone()),
            ShortCode::Emoji(code) => StoreKey::Emoji(code.clone()),
        }
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.schema(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_aliases() {
        assert!(ShortCode::alias("abc").is_ok());
        assert!(ShortCode::alias("Abc-123_xyz").is_ok());
        assert!(ShortCode::alias("a").is_ok());
    }

    #[test]
    fn long_alias_is_truncated() {
        let code = ShortCode::alias("averylongaliasstring").unwrap();
        assert_eq!(code.as_str(), "averylongaliasst");
        assert_eq!(code.as_str().len(), MAX_ALIAS_LENGTH);
    }

    #[test]
    fn empty_alias() {
        assert!(ShortCode::alias("").is_err());
    }

    #[test]
    fn invalid_characters() {
        assert!(ShortCode::alias("abc def").is_err());
        assert!(ShortCode::alias("abc/def").is_err());
        assert!(ShortCode::alias("abc!def").is_err());
        assert!(ShortCode::alias("emoji😀alias").is_err());
    }

    #[test]
    fn emoji_codes() {
        let code = ShortCode::emoji("🍕🚀🐙").unwrap();
        assert_eq!(code.namespace(), Namespace::Emoji);
        assert!(ShortCode::emoji("abc").is_err());
        assert!(ShortCode::emoji("").is_err());
    }

    #[test]
    fn to_url() {
        let code = ShortCode::alias("abc123").unwrap();
        assert_eq!(code.to_url("https://spoo.me"), "https://spoo.me/abc123");
        assert_eq!(code.to_url("https://spoo.me/"), "https://spoo.me/abc123");
    }

    #[test]
    fn new_codes_map_to_current_schema() {
        let code = ShortCode::alias("abc123").unwrap();
        assert_eq!(StoreKey::from(&code), StoreKey::V2("abc123".to_string()));

        let emoji = ShortCode::emoji("🍕").unwrap();
        assert_eq!(StoreKey::from(&emoji), StoreKey::Emoji("🍕".to_string()));
    }

    #[test]
    fn store_key_namespace() {
        assert_eq!(
            StoreKey::Legacy("abc".into()).namespace(),
            Namespace::Alphanumeric
        );
        assert_eq!(StoreKey::V2("abc".into()).to_string(), "v2:abc");
    }
}

use url::Url;

/// Predicates a create request must pass before a code is allocated.
pub trait LinkValidator: Send + Sync + 'static {
    /// Whether `url` is syntactically acceptable as a redirect target.
    fn is_valid_url(&self, url: &str) -> bool;

    /// Whether `url` points somewhere links may not redirect to.
    fn is_blocked_url(&self, url: &str) -> bool;

    /// Whether `password` is strong enough to protect a link.
    fn is_valid_password(&self, password: &str) -> bool;
}

/// Validator with fixed syntax rules and a configurable URL blocklist.
///
/// URLs must parse as http or https with a non-empty host; ports outside
/// `u16` and forbidden host characters are rejected by the parser. A URL is
/// blocked when it starts with one of the blocklist prefixes, compared
/// ignoring ASCII case. Passwords need at least 8 characters with a
/// letter, a digit and one of `@` or `.`, and may not contain two of
/// those special characters in a row.
#[derive(Debug, Clone, Default)]
pub struct DefaultValidator {
    blocked_prefixes: Vec<String>,
}

impl DefaultValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocked_prefixes<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocked_prefixes: prefixes
                .into_iter()
                .map(|prefix| prefix.into().to_ascii_lowercase())
                .filter(|prefix| !prefix.is_empty())
                .collect(),
        }
    }
}

const PASSWORD_MIN_LEN: usize = 8;

fn is_password_special(c: char) -> bool {
    c == '@' || c == '.'
}

impl LinkValidator for DefaultValidator {
    fn is_valid_url(&self, url: &str) -> bool {
        // `Url::parse` trims surrounding whitespace but targets are stored verbatim.
        if url.chars().any(char::is_whitespace) {
            return false;
        }
        match Url::parse(url) {
            Ok(parsed) => {
                matches!(parsed.scheme(), "http" | "https")
                    && parsed.host_str().is_some_and(|host| !host.is_empty())
            }
            Err(_) => false,
        }
    }

    fn is_blocked_url(&self, url: &str) -> bool {
        let url = url.to_ascii_lowercase();
        self.blocked_prefixes
            .iter()
            .any(|prefix| url.starts_with(prefix.as_str()))
    }

    fn is_valid_password(&self, password: &str) -> bool {
        password.chars().count() >= PASSWORD_MIN_LEN
            && password.chars().any(|c| c.is_ascii_alphabetic())
            && password.chars().any(|c| c.is_ascii_digit())
            && password.chars().any(is_password_special)
            && !password
                .chars()
                .zip(password.chars().skip(1))
                .any(|(a, b)| is_password_special(a) && is_password_special(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        let validator = DefaultValidator::new();
        assert!(validator.is_valid_url("https://example.com"));
        assert!(validator.is_valid_url("http://example.com/path?q=1#frag"));
        assert!(validator.is_valid_url("HTTPS://Example.com"));
        assert!(validator.is_valid_url("https://user:pw@example.com:8443/x"));
        assert!(validator.is_valid_url("http://[::1]:8080/"));
    }

    #[test]
    fn rejects_malformed_urls() {
        let validator = DefaultValidator::new();
        assert!(!validator.is_valid_url(""));
        assert!(!validator.is_valid_url("not-a-valid-url"));
        assert!(!validator.is_valid_url("ftp://example.com"));
        assert!(!validator.is_valid_url("https://"));
        assert!(!validator.is_valid_url("https://exa mple.com"));
        assert!(!validator.is_valid_url(" https://example.com"));
        assert!(!validator.is_valid_url("mailto:someone@example.com"));
    }

    #[test]
    fn rejects_bad_ports() {
        let validator = DefaultValidator::new();
        assert!(!validator.is_valid_url("https://example.com:99999"));
        assert!(!validator.is_valid_url("https://example.com:abc"));
        assert!(validator.is_valid_url("https://example.com:65535/"));
    }

    #[test]
    fn rejects_forbidden_host_characters() {
        let validator = DefaultValidator::new();
        assert!(!validator.is_valid_url("http://exa<>mple.com"));
        assert!(!validator.is_valid_url("http://exa|mple.com"));
        assert!(!validator.is_valid_url("http://[::1/"));
    }

    #[test]
    fn blocklist_matches_prefix_ignoring_case() {
        let validator =
            DefaultValidator::with_blocked_prefixes(["https://spoo.me", "http://evil.example/"]);
        assert!(validator.is_blocked_url("https://SPOO.me/abc"));
        assert!(validator.is_blocked_url("http://evil.example/phish"));
        assert!(!validator.is_blocked_url("https://example.com"));
        assert!(!DefaultValidator::new().is_blocked_url("https://spoo.me"));
    }

    #[test]
    fn password_rules() {
        let validator = DefaultValidator::new();
        assert!(validator.is_valid_password("s3cret@pw"));
        assert!(validator.is_valid_password("abc.1234"));

        assert!(!validator.is_valid_password("a1@b"), "too short");
        assert!(!validator.is_valid_password("12345678@"), "no letter");
        assert!(!validator.is_valid_password("abcdefgh@"), "no digit");
        assert!(!validator.is_valid_password("abcd12345"), "no special");
        assert!(!validator.is_valid_password("abc1@.xyz"), "adjacent specials");
    }
}

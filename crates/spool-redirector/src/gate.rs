use spool_core::ShortLinkRecord;
use std::fmt::Display;

/// Outcome of evaluating a record's access policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    Allow,
    DenyPassword,
    DenyLimit,
    DenyBot,
}

impl Decision {
    pub fn is_allow(self) -> bool {
        self == Decision::Allow
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Allow => f.write_str("allow"),
            Decision::DenyPassword => f.write_str("deny_password"),
            Decision::DenyLimit => f.write_str("deny_limit"),
            Decision::DenyBot => f.write_str("deny_bot"),
        }
    }
}

/// Access policy evaluation.
///
/// Rules are checked in a fixed order and the first match wins: bot
/// blocking, then the password, then the click limit. A bot or a caller
/// without the password therefore never uses up a click.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    pub fn check(
        record: &ShortLinkRecord,
        supplied_password: Option<&str>,
        caller_is_bot: bool,
    ) -> Decision {
        if record.block_bots && caller_is_bot {
            return Decision::DenyBot;
        }

        if let Some(password) = record.password.as_deref() {
            if supplied_password != Some(password) {
                return Decision::DenyPassword;
            }
        }

        if record.click_limit_reached() {
            return Decision::DenyLimit;
        }

        Decision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::Timestamp;

    fn record() -> ShortLinkRecord {
        ShortLinkRecord::builder()
            .code("abc123")
            .target_url("https://example.com")
            .created_at(Timestamp::from_second(0).unwrap())
            .creator_ip("127.0.0.1")
            .build()
    }

    #[test]
    fn open_record_allows_everyone() {
        let record = record();
        assert_eq!(AccessGate::check(&record, None, false), Decision::Allow);
        assert_eq!(AccessGate::check(&record, None, true), Decision::Allow);
        assert_eq!(AccessGate::check(&record, Some("x"), false), Decision::Allow);
    }

    #[test]
    fn password_must_match_exactly() {
        let record = ShortLinkRecord {
            password: Some("s3cret@pw".to_string()),
            ..record()
        };
        assert_eq!(
            AccessGate::check(&record, Some("s3cret@pw"), false),
            Decision::Allow
        );
        assert_eq!(
            AccessGate::check(&record, Some("S3CRET@PW"), false),
            Decision::DenyPassword
        );
        assert_eq!(AccessGate::check(&record, Some(""), false), Decision::DenyPassword);
        assert_eq!(AccessGate::check(&record, None, false), Decision::DenyPassword);
    }

    #[test]
    fn bots_are_denied_before_password() {
        let record = ShortLinkRecord {
            password: Some("x".to_string()),
            block_bots: true,
            ..record()
        };
        assert_eq!(AccessGate::check(&record, Some("x"), true), Decision::DenyBot);
        assert_eq!(AccessGate::check(&record, Some("x"), false), Decision::Allow);
    }

    #[test]
    fn password_is_checked_before_limit() {
        let record = ShortLinkRecord {
            password: Some("x".to_string()),
            max_clicks: Some(1),
            total_clicks: 1,
            ..record()
        };
        assert_eq!(AccessGate::check(&record, None, false), Decision::DenyPassword);
        assert_eq!(AccessGate::check(&record, Some("x"), false), Decision::DenyLimit);
    }

    #[test]
    fn limit_applies_at_max_clicks() {
        let below = ShortLinkRecord {
            max_clicks: Some(2),
            total_clicks: 1,
            ..record()
        };
        let at = ShortLinkRecord {
            total_clicks: 2,
            ..below.clone()
        };
        assert_eq!(AccessGate::check(&below, None, false), Decision::Allow);
        assert_eq!(AccessGate::check(&at, None, false), Decision::DenyLimit);
    }
}

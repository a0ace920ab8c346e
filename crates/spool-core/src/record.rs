use jiff::civil::Date;
use jiff::tz::TimeZone;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use typed_builder::TypedBuilder;

/// One code-to-URL mapping with its access policy and usage counters.
///
/// The policy fields (`target_url`, `password`, `max_clicks`, `block_bots`)
/// and the creation metadata never change after the record is created.
/// Only the counters move, and only through
/// [`RecordStore::increment_counters`](crate::RecordStore::increment_counters).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
pub struct ShortLinkRecord {
    #[builder(setter(into))]
    pub code: String,
    #[builder(setter(into))]
    pub target_url: String,
    #[builder(default)]
    pub password: Option<String>,
    #[builder(default)]
    pub max_clicks: Option<u64>,
    #[builder(default)]
    pub block_bots: bool,
    #[builder(default)]
    pub total_clicks: u64,
    #[builder(default)]
    pub per_day_counter: BTreeMap<Date, u64>,
    /// Clicks per day from IPs not already in `recent_ips`.
    #[builder(default)]
    pub unique_per_day_counter: BTreeMap<Date, u64>,
    /// Allowed clicks from automated clients, by bot name.
    #[builder(default)]
    pub bot_counter: BTreeMap<String, u64>,
    #[builder(default)]
    pub recent_ips: Vec<String>,
    pub created_at: Timestamp,
    #[builder(setter(into))]
    pub creator_ip: String,
    #[builder(default)]
    pub last_click_at: Option<Timestamp>,
}

impl ShortLinkRecord {
    /// Returns `true` once the record has used up its click allowance.
    pub fn click_limit_reached(&self) -> bool {
        self.max_clicks
            .is_some_and(|max_clicks| self.total_clicks >= max_clicks)
    }

    /// Applies one successful resolution to the counters.
    ///
    /// A click is unique when its IP is not yet in `recent_ips`, so with a
    /// cap the check only looks as far back as the retained window.
    /// `recent_ips_cap` bounds `recent_ips`, keeping the newest entries; `0`
    /// disables the cap. Callers are responsible for exclusive access.
    pub fn record_click(&mut self, click: &ClickEvent, recent_ips_cap: usize) -> u64 {
        let unique = !self.recent_ips.contains(&click.client_ip);
        self.total_clicks += 1;
        *self.per_day_counter.entry(click.date).or_insert(0) += 1;
        if unique {
            *self.unique_per_day_counter.entry(click.date).or_insert(0) += 1;
        }
        if let Some(bot) = &click.bot {
            *self.bot_counter.entry(bot.clone()).or_insert(0) += 1;
        }
        self.last_click_at = Some(click.at);
        self.recent_ips.push(click.client_ip.clone());
        if recent_ips_cap > 0 && self.recent_ips.len() > recent_ips_cap {
            let excess = self.recent_ips.len() - recent_ips_cap;
            self.recent_ips.drain(..excess);
        }
        self.total_clicks
    }
}

/// A successful resolution to be accounted against a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickEvent {
    /// Calendar day (UTC) the click is counted under.
    pub date: Date,
    pub at: Timestamp,
    pub client_ip: String,
    /// Name of the bot that made the request, if it was automated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot: Option<String>,
}

impl ClickEvent {
    pub fn new(at: Timestamp, client_ip: impl Into<String>) -> Self {
        Self {
            date: at.to_zoned(TimeZone::UTC).date(),
            at,
            client_ip: client_ip.into(),
            bot: None,
        }
    }

    pub fn with_bot(mut self, name: impl Into<String>) -> Self {
        self.bot = Some(name.into());
        self
    }
}

/// Result of an atomic counter increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The click was counted; carries the new total.
    Counted { total_clicks: u64 },
    /// The record's `max_clicks` was already reached; nothing changed.
    LimitReached,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ShortLinkRecord {
        ShortLinkRecord::builder()
            .code("abc123")
            .target_url("https://example.com")
            .created_at(Timestamp::from_second(0).unwrap())
            .creator_ip("127.0.0.1")
            .build()
    }

    fn click(second: i64, ip: &str) -> ClickEvent {
        ClickEvent::new(Timestamp::from_second(second).unwrap(), ip)
    }

    #[test]
    fn new_record_starts_empty() {
        let record = record();
        assert_eq!(record.total_clicks, 0);
        assert!(record.per_day_counter.is_empty());
        assert!(record.recent_ips.is_empty());
        assert!(record.unique_per_day_counter.is_empty());
        assert!(record.bot_counter.is_empty());
        assert!(!record.block_bots);
        assert!(!record.click_limit_reached());
    }

    #[test]
    fn click_event_uses_utc_day() {
        let event = click(86_400 + 5, "10.0.0.1");
        assert_eq!(event.date, jiff::civil::date(1970, 1, 2));
    }

    #[test]
    fn counters_stay_consistent() {
        let mut record = record();
        record.record_click(&click(10, "10.0.0.1"), 0);
        record.record_click(&click(20, "10.0.0.2"), 0);
        let total = record.record_click(&click(86_400 + 1, "10.0.0.1"), 0);

        assert_eq!(total, 3);
        assert_eq!(record.per_day_counter.values().sum::<u64>(), 3);
        assert_eq!(record.per_day_counter.len(), 2);
        assert_eq!(
            record.last_click_at,
            Some(Timestamp::from_second(86_401).unwrap())
        );
    }

    #[test]
    fn unique_clicks_count_first_sightings_per_ip() {
        let mut record = record();
        record.record_click(&click(10, "10.0.0.1"), 0);
        record.record_click(&click(20, "10.0.0.1"), 0);
        record.record_click(&click(30, "10.0.0.2"), 0);
        record.record_click(&click(86_400 + 1, "10.0.0.1"), 0);
        record.record_click(&click(86_400 + 2, "10.0.0.3"), 0);

        let day1 = jiff::civil::date(1970, 1, 1);
        let day2 = jiff::civil::date(1970, 1, 2);
        assert_eq!(record.unique_per_day_counter.get(&day1), Some(&2));
        assert_eq!(record.unique_per_day_counter.get(&day2), Some(&1));
        assert_eq!(record.per_day_counter.get(&day1), Some(&3));
        assert!(record.unique_per_day_counter.values().sum::<u64>() <= record.total_clicks);
    }

    #[test]
    fn uniqueness_only_sees_retained_ips() {
        let mut record = record();
        record.record_click(&click(1, "10.0.0.1"), 1);
        record.record_click(&click(2, "10.0.0.2"), 1);
        record.record_click(&click(3, "10.0.0.1"), 1);

        let day = jiff::civil::date(1970, 1, 1);
        assert_eq!(record.unique_per_day_counter.get(&day), Some(&3));
    }

    #[test]
    fn bot_clicks_are_counted_by_name() {
        let mut record = record();
        record.record_click(&click(1, "66.249.0.1").with_bot("Googlebot"), 0);
        record.record_click(&click(2, "66.249.0.1").with_bot("Googlebot"), 0);
        record.record_click(&click(3, "10.0.0.1").with_bot("curl"), 0);
        record.record_click(&click(4, "10.0.0.2"), 0);

        assert_eq!(record.bot_counter.get("Googlebot"), Some(&2));
        assert_eq!(record.bot_counter.get("curl"), Some(&1));
        assert_eq!(record.bot_counter.len(), 2);
        assert_eq!(record.total_clicks, 4);
    }

    #[test]
    fn recent_ips_keep_newest_entries() {
        let mut record = record();
        for i in 0..5 {
            record.record_click(&click(i, &format!("10.0.0.{i}")), 3);
        }
        assert_eq!(record.recent_ips, vec!["10.0.0.2", "10.0.0.3", "10.0.0.4"]);
        assert_eq!(record.total_clicks, 5);
    }

    #[test]
    fn click_limit() {
        let mut record = ShortLinkRecord {
            max_clicks: Some(2),
            ..record()
        };
        record.record_click(&click(1, "10.0.0.1"), 0);
        assert!(!record.click_limit_reached());
        record.record_click(&click(2, "10.0.0.1"), 0);
        assert!(record.click_limit_reached());
    }

    #[test]
    fn per_day_counter_serializes_with_date_keys() {
        let mut record = record();
        record.record_click(&click(10, "10.0.0.1"), 0);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["per_day_counter"]["1970-01-01"], 1);
    }
}

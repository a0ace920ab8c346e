use async_trait::async_trait;
use jiff::civil::Date;
use jiff::Timestamp;
use redis::Script;
use serde::{Deserialize, Serialize};
use spool_core::repository::Result;
use spool_core::{ClickEvent, ClickOutcome, RecordStore, ShortLinkRecord, StorageError, StoreKey};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

const DOC_FIELD: &str = "doc";
const TOTAL_FIELD: &str = "total_clicks";
const LAST_CLICK_FIELD: &str = "last_click_at";
const DAY_FIELD_PREFIX: &str = "day:";
const UNIQUE_DAY_FIELD_PREFIX: &str = "uday:";
const BOT_FIELD_PREFIX: &str = "bot:";

/// Claims `KEYS[1]` unless it or `KEYS[2]` already exists, writing the
/// record's counters and its IP list (`KEYS[3]`) in the same step.
///
/// ARGV: document, total clicks, last click timestamp ('' = none), number
/// of counter field/value pairs, the pairs, then the IPs oldest first.
static CREATE_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
        if redis.call('EXISTS', KEYS[1]) == 1 or redis.call('EXISTS', KEYS[2]) == 1 then
            return 0
        end
        redis.call('HSET', KEYS[1], 'doc', ARGV[1], 'total_clicks', ARGV[2])
        if ARGV[3] ~= '' then
            redis.call('HSET', KEYS[1], 'last_click_at', ARGV[3])
        end
        local counters_end = 4 + 2 * tonumber(ARGV[4])
        for i = 5, counters_end, 2 do
            redis.call('HSET', KEYS[1], ARGV[i], ARGV[i + 1])
        end
        redis.call('DEL', KEYS[3])
        for i = counters_end + 1, #ARGV do
            redis.call('RPUSH', KEYS[3], ARGV[i])
        end
        return 1
        "#,
    )
});

/// Counts one click against `KEYS[1]`, appending the IP to `KEYS[2]`.
///
/// ARGV: day field, client ip, click timestamp, click limit (0 = none),
/// recent ip cap (0 = none), unique day field, bot field ('' = none).
/// Returns the new total, -1 if the record is missing or -2 if the limit
/// was already reached.
static INCREMENT_SCRIPT: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r#"
        if redis.call('EXISTS', KEYS[1]) == 0 then
            return -1
        end
        local limit = tonumber(ARGV[4])
        if limit > 0 then
            local current = tonumber(redis.call('HGET', KEYS[1], 'total_clicks') or '0')
            if current >= limit then
                return -2
            end
        end
        local total = redis.call('HINCRBY', KEYS[1], 'total_clicks', 1)
        redis.call('HINCRBY', KEYS[1], ARGV[1], 1)
        if not redis.call('LPOS', KEYS[2], ARGV[2]) then
            redis.call('HINCRBY', KEYS[1], ARGV[6], 1)
        end
        if ARGV[7] ~= '' then
            redis.call('HINCRBY', KEYS[1], ARGV[7], 1)
        end
        redis.call('HSET', KEYS[1], 'last_click_at', ARGV[3])
        redis.call('RPUSH', KEYS[2], ARGV[2])
        local cap = tonumber(ARGV[5])
        if cap > 0 then
            redis.call('LTRIM', KEYS[2], -cap, -1)
        end
        return total
        "#,
    )
});

/// Configures a [`RedisStore`].
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisStoreSettings {
    /// Prefix for every key the store writes (e.g., "spool").
    #[builder(default = "spool".to_string(), setter(into))]
    pub key_prefix: String,
    /// Number of client IPs kept per record; `0` keeps all of them.
    #[builder(default = 1000)]
    pub recent_ips_cap: usize,
}

impl Default for RedisStoreSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// The immutable part of a record, stored as JSON in the `doc` field.
#[derive(Debug, Serialize, Deserialize)]
struct StoredLink {
    code: String,
    target_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_clicks: Option<u64>,
    #[serde(default)]
    block_bots: bool,
    created_at: Timestamp,
    creator_ip: String,
}

impl StoredLink {
    fn from_record(code: &str, record: &ShortLinkRecord) -> Self {
        Self {
            code: code.to_owned(),
            target_url: record.target_url.clone(),
            password: record.password.clone(),
            max_clicks: record.max_clicks,
            block_bots: record.block_bots,
            created_at: record.created_at,
            creator_ip: record.creator_ip.clone(),
        }
    }
}

/// Hash fields holding a record's keyed counters.
fn counter_fields(record: &ShortLinkRecord) -> Vec<(String, u64)> {
    let days = record
        .per_day_counter
        .iter()
        .map(|(date, count)| (format!("{DAY_FIELD_PREFIX}{date}"), *count));
    let unique_days = record
        .unique_per_day_counter
        .iter()
        .map(|(date, count)| (format!("{UNIQUE_DAY_FIELD_PREFIX}{date}"), *count));
    let bots = record
        .bot_counter
        .iter()
        .map(|(name, count)| (format!("{BOT_FIELD_PREFIX}{name}"), *count));
    days.chain(unique_days).chain(bots).collect()
}

/// Redis implementation of [`RecordStore`].
///
/// Every record is a hash holding the immutable document plus its counters,
/// with the recent client IPs in a sibling list. Creates and increments run
/// as Lua scripts, which Redis executes atomically.
///
/// Key layout: `{prefix}:{v2|legacy|emoji}:{code}` and `{...}:ips`.
#[derive(Clone)]
pub struct RedisStore {
    conn: redis::aio::MultiplexedConnection,
    settings: RedisStoreSettings,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> StorageError {
    let message = format!("{operation}: {err}");
    if message.to_ascii_lowercase().contains("timed out") {
        StorageError::Timeout(message)
    } else if err.is_io_error() {
        StorageError::Unavailable(message)
    } else {
        StorageError::Query(message)
    }
}

impl RedisStore {
    /// Creates a store from an existing multiplexed connection.
    pub fn new(conn: redis::aio::MultiplexedConnection, settings: RedisStoreSettings) -> Self {
        Self { conn, settings }
    }

    /// Opens a new multiplexed connection to `redis_url`.
    pub async fn connect(redis_url: &str, settings: RedisStoreSettings) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| map_redis_error("invalid redis url", e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| StorageError::Unavailable(format!("failed to connect to redis: {e}")))?;
        Ok(Self::new(conn, settings))
    }

    /// Writes a record under the legacy schema, keyed by its code.
    ///
    /// The engine never creates legacy records; this exists for migration
    /// tooling and fixtures. Counters and recent IPs on `record` are
    /// migrated with it. Returns `Err(Conflict)` if the code exists in
    /// either alphanumeric schema.
    pub async fn insert_legacy(&self, record: ShortLinkRecord) -> Result<()> {
        let key = self.record_key(&StoreKey::Legacy(record.code.clone()));
        let v2 = self.record_key(&StoreKey::V2(record.code.clone()));
        let code = record.code.clone();
        self.claim(&key, &v2, &code, &record).await
    }

    fn record_key(&self, key: &StoreKey) -> String {
        format!("{}:{}:{}", self.settings.key_prefix, key.schema(), key.code())
    }

    fn ips_key(record_key: &str) -> String {
        format!("{record_key}:ips")
    }

    async fn claim(
        &self,
        key: &str,
        shadow: &str,
        code: &str,
        record: &ShortLinkRecord,
    ) -> Result<()> {
        let doc = serde_json::to_string(&StoredLink::from_record(code, record)).map_err(|e| {
            StorageError::InvalidData(format!("failed to serialize record '{code}': {e}"))
        })?;
        let last_click_at = record
            .last_click_at
            .map(|at| at.to_string())
            .unwrap_or_default();
        let counters = counter_fields(record);
        let cap = self.settings.recent_ips_cap;
        let skip = match cap {
            0 => 0,
            cap => record.recent_ips.len().saturating_sub(cap),
        };

        let mut invocation = CREATE_SCRIPT.prepare_invoke();
        invocation
            .key(key)
            .key(shadow)
            .key(Self::ips_key(key))
            .arg(doc)
            .arg(record.total_clicks)
            .arg(last_click_at)
            .arg(counters.len());
        for (field, count) in &counters {
            invocation.arg(field).arg(*count);
        }
        for ip in &record.recent_ips[skip..] {
            invocation.arg(ip);
        }

        let mut conn = self.conn.clone();
        let created: i64 = invocation
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to create record", e))?;

        if created == 1 {
            debug!(key = %key, "Created record in Redis");
            Ok(())
        } else {
            trace!(key = %key, "Record key already claimed");
            Err(StorageError::Conflict(code.to_owned()))
        }
    }

    async fn exists_any(&self, keys: &[String]) -> Result<bool> {
        let mut cmd = redis::cmd("EXISTS");
        for key in keys {
            cmd.arg(key);
        }
        let mut conn = self.conn.clone();
        let count: i64 = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to check existence", e))?;
        Ok(count > 0)
    }

    async fn lookup(&self, key: &StoreKey) -> Result<Option<ShortLinkRecord>> {
        let record_key = self.record_key(key);
        trace!(key = %key, "Fetching record from Redis");

        let mut conn = self.conn.clone();
        let (fields, ips): (HashMap<String, String>, Vec<String>) = redis::pipe()
            .atomic()
            .hgetall(&record_key)
            .lrange(Self::ips_key(&record_key), 0, -1)
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to fetch record", e))?;

        if fields.is_empty() {
            return Ok(None);
        }

        decode_record(&record_key, fields, ips).map(Some)
    }
}

/// Rebuilds a record from its hash fields and IP list.
fn decode_record(
    record_key: &str,
    mut fields: HashMap<String, String>,
    recent_ips: Vec<String>,
) -> Result<ShortLinkRecord> {
    let invalid = |what: &str, detail: String| {
        warn!(key = %record_key, "Stored record is invalid");
        StorageError::InvalidData(format!("{what} for '{record_key}': {detail}"))
    };

    let doc = fields
        .remove(DOC_FIELD)
        .ok_or_else(|| invalid("missing document", String::new()))?;
    let doc: StoredLink =
        serde_json::from_str(&doc).map_err(|e| invalid("invalid document", e.to_string()))?;

    let total_clicks = match fields.remove(TOTAL_FIELD) {
        Some(raw) => raw
            .parse::<u64>()
            .map_err(|e| invalid("invalid total_clicks", e.to_string()))?,
        None => 0,
    };

    let last_click_at = fields
        .remove(LAST_CLICK_FIELD)
        .map(|raw| raw.parse::<Timestamp>())
        .transpose()
        .map_err(|e| invalid("invalid last_click_at", e.to_string()))?;

    let mut per_day_counter = BTreeMap::new();
    let mut unique_per_day_counter = BTreeMap::new();
    let mut bot_counter = BTreeMap::new();
    for (field, raw) in fields {
        let parse_count = |raw: &str| {
            raw.parse::<u64>()
                .map_err(|e| invalid("invalid counter", format!("{field}: {e}")))
        };
        let parse_date = |day: &str| {
            day.parse::<Date>()
                .map_err(|e| invalid("invalid day field", format!("{field}: {e}")))
        };

        if let Some(day) = field.strip_prefix(DAY_FIELD_PREFIX) {
            per_day_counter.insert(parse_date(day)?, parse_count(&raw)?);
        } else if let Some(day) = field.strip_prefix(UNIQUE_DAY_FIELD_PREFIX) {
            unique_per_day_counter.insert(parse_date(day)?, parse_count(&raw)?);
        } else if let Some(name) = field.strip_prefix(BOT_FIELD_PREFIX) {
            bot_counter.insert(name.to_owned(), parse_count(&raw)?);
        }
    }

    Ok(ShortLinkRecord {
        code: doc.code,
        target_url: doc.target_url,
        password: doc.password,
        max_clicks: doc.max_clicks,
        block_bots: doc.block_bots,
        total_clicks,
        per_day_counter,
        unique_per_day_counter,
        bot_counter,
        recent_ips,
        created_at: doc.created_at,
        creator_ip: doc.creator_ip,
        last_click_at,
    })
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn exists_alphanumeric(&self, code: &str) -> Result<bool> {
        let keys = [
            self.record_key(&StoreKey::V2(code.to_owned())),
            self.record_key(&StoreKey::Legacy(code.to_owned())),
        ];
        self.exists_any(&keys).await
    }

    async fn exists_emoji(&self, code: &str) -> Result<bool> {
        let keys = [self.record_key(&StoreKey::Emoji(code.to_owned()))];
        self.exists_any(&keys).await
    }

    async fn create_alphanumeric(&self, code: &str, record: ShortLinkRecord) -> Result<()> {
        let key = self.record_key(&StoreKey::V2(code.to_owned()));
        let legacy = self.record_key(&StoreKey::Legacy(code.to_owned()));
        self.claim(&key, &legacy, code, &record).await
    }

    async fn create_emoji(&self, code: &str, record: ShortLinkRecord) -> Result<()> {
        let key = self.record_key(&StoreKey::Emoji(code.to_owned()));
        self.claim(&key, &key, code, &record).await
    }

    async fn lookup_v2(&self, alias: &str) -> Result<Option<ShortLinkRecord>> {
        self.lookup(&StoreKey::V2(alias.to_owned())).await
    }

    async fn lookup_legacy(&self, code: &str) -> Result<Option<ShortLinkRecord>> {
        self.lookup(&StoreKey::Legacy(code.to_owned())).await
    }

    async fn lookup_emoji(&self, code: &str) -> Result<Option<ShortLinkRecord>> {
        self.lookup(&StoreKey::Emoji(code.to_owned())).await
    }

    async fn increment_counters(
        &self,
        key: &StoreKey,
        click: &ClickEvent,
        max_clicks: Option<u64>,
    ) -> Result<Option<ClickOutcome>> {
        let record_key = self.record_key(key);
        let mut conn = self.conn.clone();
        let result: i64 = INCREMENT_SCRIPT
            .key(&record_key)
            .key(Self::ips_key(&record_key))
            .arg(format!("{DAY_FIELD_PREFIX}{}", click.date))
            .arg(&click.client_ip)
            .arg(click.at.to_string())
            .arg(max_clicks.unwrap_or(0))
            .arg(self.settings.recent_ips_cap)
            .arg(format!("{UNIQUE_DAY_FIELD_PREFIX}{}", click.date))
            .arg(
                click
                    .bot
                    .as_ref()
                    .map(|name| format!("{BOT_FIELD_PREFIX}{name}"))
                    .unwrap_or_default(),
            )
            .invoke_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to increment counters", e))?;

        match result {
            -1 => Ok(None),
            -2 => {
                trace!(key = %key, "click limit already reached");
                Ok(Some(ClickOutcome::LimitReached))
            }
            total if total > 0 => Ok(Some(ClickOutcome::Counted {
                total_clicks: total as u64,
            })),
            other => Err(StorageError::InvalidData(format!(
                "unexpected increment result {other} for '{record_key}'"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn doc() -> String {
        serde_json::json!({
            "code": "abc123",
            "target_url": "https://example.com",
            "max_clicks": 10,
            "created_at": "2026-10-18T12:00:00Z",
            "creator_ip": "127.0.0.1",
        })
        .to_string()
    }

    #[test]
    fn decodes_full_record() {
        let doc = doc();
        let record = decode_record(
            "spool:v2:abc123",
            fields(&[
                (DOC_FIELD, &doc),
                (TOTAL_FIELD, "3"),
                ("day:2026-10-17", "1"),
                ("day:2026-10-18", "2"),
                ("uday:2026-10-18", "1"),
                ("bot:Googlebot", "2"),
                (LAST_CLICK_FIELD, "2026-10-18T13:00:00Z"),
            ]),
            vec!["10.0.0.1".to_string()],
        )
        .unwrap();

        assert_eq!(record.code, "abc123");
        assert_eq!(record.max_clicks, Some(10));
        assert!(!record.block_bots);
        assert_eq!(record.password, None);
        assert_eq!(record.total_clicks, 3);
        assert_eq!(record.per_day_counter.values().sum::<u64>(), 3);
        assert_eq!(
            record.per_day_counter.get(&jiff::civil::date(2026, 10, 18)),
            Some(&2)
        );
        assert_eq!(
            record
                .unique_per_day_counter
                .get(&jiff::civil::date(2026, 10, 18)),
            Some(&1)
        );
        assert_eq!(record.bot_counter.get("Googlebot"), Some(&2));
        assert_eq!(record.recent_ips, vec!["10.0.0.1"]);
        assert!(record.last_click_at.is_some());
    }

    #[test]
    fn counter_fields_cover_every_keyed_counter() {
        let mut record = ShortLinkRecord::builder()
            .code("abc123")
            .target_url("https://example.com")
            .created_at(Timestamp::from_second(0).unwrap())
            .creator_ip("127.0.0.1")
            .build();
        let click = ClickEvent::new(Timestamp::from_second(10).unwrap(), "10.0.0.1");
        record.record_click(&click.clone().with_bot("Googlebot"), 0);
        record.record_click(&click, 0);

        let mut fields = counter_fields(&record);
        fields.sort();
        assert_eq!(
            fields,
            vec![
                ("bot:Googlebot".to_string(), 1),
                ("day:1970-01-01".to_string(), 2),
                ("uday:1970-01-01".to_string(), 1),
            ]
        );
    }

    #[test]
    fn counter_fields_decode_back() {
        let doc = doc();
        let record = decode_record(
            "spool:legacy:abc123",
            fields(&[
                (DOC_FIELD, &doc),
                (TOTAL_FIELD, "2"),
                ("day:2026-10-18", "2"),
                ("uday:2026-10-18", "1"),
                ("bot:curl", "1"),
            ]),
            vec![],
        )
        .unwrap();

        let mut fields = counter_fields(&record);
        fields.sort();
        assert_eq!(
            fields,
            vec![
                ("bot:curl".to_string(), 1),
                ("day:2026-10-18".to_string(), 2),
                ("uday:2026-10-18".to_string(), 1),
            ]
        );
    }

    #[test]
    fn fresh_record_has_zero_counters() {
        let doc = doc();
        let record = decode_record(
            "spool:v2:abc123",
            fields(&[(DOC_FIELD, &doc), (TOTAL_FIELD, "0")]),
            vec![],
        )
        .unwrap();

        assert_eq!(record.total_clicks, 0);
        assert!(record.per_day_counter.is_empty());
        assert_eq!(record.last_click_at, None);
    }

    #[test]
    fn missing_document_is_invalid() {
        let err = decode_record("spool:v2:x", fields(&[(TOTAL_FIELD, "1")]), vec![]).unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[test]
    fn bad_counter_is_invalid() {
        let doc = doc();
        let err = decode_record(
            "spool:v2:x",
            fields(&[(DOC_FIELD, &doc), ("day:2026-10-18", "many")]),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));

        let err = decode_record(
            "spool:v2:x",
            fields(&[(DOC_FIELD, &doc), ("uday:yesterday", "1")]),
            vec![],
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::InvalidData(_)));
    }

    #[test]
    fn settings_defaults() {
        let settings = RedisStoreSettings::default();
        assert_eq!(settings.key_prefix, "spool");
        assert_eq!(settings.recent_ips_cap, 1000);
    }
}

//! HMAC verification of init data strings.
//!
//! The check follows Telegram's Mini App rules:
//!
//! 1. Split the string into `key=value` pairs (first `=` only) and
//!    percent-decode both halves. A repeated key keeps its last value.
//! 2. Remove `hash`, sort what is left by key (byte order) and join the
//!    pairs as `key=value` lines separated by `\n`.
//! 3. `secret = HMAC-SHA256(key = "WebAppData", msg = bot_token)`
//! 4. `hash == hex(HMAC-SHA256(key = secret, msg = check_string))`

use crate::error::InitDataError;
use crate::user::WebAppUser;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Fixed key used to derive the signing key from the bot token.
const WEB_APP_DATA_KEY: &[u8] = b"WebAppData";

const HASH_FIELD: &str = "hash";
const USER_FIELD: &str = "user";
const AUTH_DATE_FIELD: &str = "auth_date";

/// Verifies init data signed for one bot.
///
/// The signing key is derived once from the bot token at construction.
/// Verification is a pure function of the input and holds no mutable state,
/// so a single verifier can be shared across threads freely.
#[derive(Clone)]
pub struct InitDataVerifier {
    signing_key: [u8; 32],
    max_age: Option<Duration>,
}

impl InitDataVerifier {
    /// Create a verifier for the given bot token.
    pub fn new(bot_token: impl AsRef<[u8]>) -> Self {
        Self {
            signing_key: derive_signing_key(bot_token.as_ref()),
            max_age: None,
        }
    }

    /// Reject init data whose `auth_date` is older than `max_age`.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Verify init data and return the user it carries.
    pub fn verify(&self, raw: &str) -> Result<WebAppUser, InitDataError> {
        self.verify_at(raw, Utc::now())
    }

    /// Verify init data, judging freshness against `now`.
    ///
    /// `now` is only consulted when a maximum age is configured.
    pub fn verify_at(&self, raw: &str, now: DateTime<Utc>) -> Result<WebAppUser, InitDataError> {
        let mut fields = parse_fields(raw)?;
        let received_hash = fields.remove(HASH_FIELD).ok_or(InitDataError::MissingHash)?;

        let computed_hash = self.compute_hash(&data_check_string(&fields));
        if !bool::from(computed_hash.as_bytes().ct_eq(received_hash.as_bytes())) {
            debug!(field_count = fields.len(), "Init data hash mismatch");
            return Err(InitDataError::HashMismatch);
        }

        if let Some(max_age) = self.max_age {
            check_freshness(&fields, max_age, now)?;
        }

        match fields.get(USER_FIELD) {
            Some(user) => WebAppUser::from_json(user),
            None => Ok(WebAppUser::default()),
        }
    }

    /// Build a signed init data string from `fields`.
    ///
    /// Pairs are emitted in the order given, percent-encoded, with `hash`
    /// appended last. Any `hash` entry in `fields` is ignored.
    pub fn sign(&self, fields: &[(&str, &str)]) -> String {
        let canonical: BTreeMap<String, String> = fields
            .iter()
            .filter(|(key, _)| *key != HASH_FIELD)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let hash = self.compute_hash(&data_check_string(&canonical));

        fields
            .iter()
            .filter(|(key, _)| *key != HASH_FIELD)
            .map(|(key, value)| format!("{}={}", urlencoding::encode(key), urlencoding::encode(value)))
            .chain(std::iter::once(format!("{HASH_FIELD}={hash}")))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn compute_hash(&self, check_string: &str) -> String {
        let mut mac = new_mac(&self.signing_key);
        mac.update(check_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl fmt::Debug for InitDataVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitDataVerifier")
            .field("signing_key", &"[REDACTED]")
            .field("max_age", &self.max_age)
            .finish()
    }
}

fn new_mac(key: &[u8]) -> HmacSha256 {
    // HMAC takes keys of any length; this cannot fail.
    HmacSha256::new_from_slice(key).expect("HMAC-SHA256 accepts any key size")
}

fn derive_signing_key(bot_token: &[u8]) -> [u8; 32] {
    let mut mac = new_mac(WEB_APP_DATA_KEY);
    mac.update(bot_token);

    let mut key = [0u8; 32];
    key.copy_from_slice(&mac.finalize().into_bytes());
    key
}

/// Split a raw init data string into decoded fields.
fn parse_fields(raw: &str) -> Result<BTreeMap<String, String>, InitDataError> {
    if raw.is_empty() {
        return Err(InitDataError::MalformedInput("empty init data".into()));
    }

    let mut fields = BTreeMap::new();
    for pair in raw.split('&') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| InitDataError::MalformedInput("pair without '='".into()))?;
        fields.insert(decode(key)?, decode(value)?);
    }

    Ok(fields)
}

fn decode(component: &str) -> Result<String, InitDataError> {
    urlencoding::decode(component)
        .map(|s| s.into_owned())
        .map_err(|e| InitDataError::MalformedInput(format!("bad percent-encoding: {}", e)))
}

/// `key=value` lines in key order, joined by `\n`.
fn data_check_string(fields: &BTreeMap<String, String>) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn check_freshness(
    fields: &BTreeMap<String, String>,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<(), InitDataError> {
    let auth_date: i64 = fields
        .get(AUTH_DATE_FIELD)
        .ok_or_else(|| InitDataError::MalformedInput("missing auth_date".into()))?
        .parse()
        .map_err(|_| InitDataError::MalformedInput("auth_date is not a unix timestamp".into()))?;

    // An age that does not fit in i64 is older than any limit
    let age_secs = now
        .timestamp()
        .checked_sub(auth_date)
        .unwrap_or(i64::MAX);
    let max_age_secs = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
    if age_secs > max_age_secs {
        return Err(InitDataError::Expired { age_secs });
    }

    Ok(())
}

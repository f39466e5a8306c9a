//! Telegram Mini App init data verification.
//!
//! A Mini App hands its backend an `initData` string: percent-encoded
//! `key=value` pairs joined by `&`, one of which is `hash`. The hash is an
//! HMAC-SHA256 over the remaining fields, keyed with a value derived from the
//! bot token, so only Telegram (and the bot owner) can produce it.
//!
//! ```
//! use telegram_init_data::InitDataVerifier;
//!
//! let verifier = InitDataVerifier::new("test_token");
//! let raw = verifier.sign(&[("auth_date", "1700000000"), ("user", r#"{"id":42}"#)]);
//!
//! let user = verifier.verify(&raw).unwrap();
//! assert!(user.matches_id("42"));
//! ```

pub mod error;
pub mod user;
pub mod verifier;

pub use error::InitDataError;
pub use user::WebAppUser;
pub use verifier::InitDataVerifier;

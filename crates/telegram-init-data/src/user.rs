//! The identity carried in the `user` field of init data.

use crate::error::InitDataError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Telegram user profile taken from verified init data.
///
/// Only `id` matters to this crate; every other field is kept exactly as
/// Telegram sent it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WebAppUser(Map<String, Value>);

impl WebAppUser {
    /// Decode the raw `user` field. Anything other than a JSON object is rejected.
    pub fn from_json(raw: &str) -> Result<Self, InitDataError> {
        serde_json::from_str::<Map<String, Value>>(raw)
            .map(Self)
            .map_err(|e| InitDataError::MalformedUserPayload(e.to_string()))
    }

    /// Telegram user id rendered as a string.
    ///
    /// Telegram sends a number; a string id is accepted as-is.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    /// Check that an identity claimed elsewhere in the request is this user.
    pub fn matches_id(&self, claimed: &str) -> bool {
        self.id().as_deref() == Some(claimed)
    }

    pub fn first_name(&self) -> Option<&str> {
        self.str_field("first_name")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.str_field("last_name")
    }

    pub fn username(&self) -> Option<&str> {
        self.str_field("username")
    }

    pub fn language_code(&self) -> Option<&str> {
        self.str_field("language_code")
    }

    /// Raw access to any profile field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// True when init data carried no `user` field.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for WebAppUser {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_id() {
        let user = WebAppUser::from_json(r#"{"id":42,"first_name":"Ada"}"#).unwrap();
        assert_eq!(user.id().as_deref(), Some("42"));
        assert_eq!(user.first_name(), Some("Ada"));
        assert!(user.matches_id("42"));
        assert!(!user.matches_id("43"));
    }

    #[test]
    fn test_string_id() {
        let user = WebAppUser::from_json(r#"{"id":"777"}"#).unwrap();
        assert!(user.matches_id("777"));
    }

    #[test]
    fn test_missing_id_never_matches() {
        let user = WebAppUser::default();
        assert!(user.is_empty());
        assert_eq!(user.id(), None);
        assert!(!user.matches_id(""));
        assert!(!user.matches_id("None"));
    }

    #[test]
    fn test_non_object_rejected() {
        for raw in ["[1,2]", "42", "\"ada\"", "{not json"] {
            assert!(matches!(
                WebAppUser::from_json(raw),
                Err(InitDataError::MalformedUserPayload(_))
            ));
        }
    }

    #[test]
    fn test_extra_fields_preserved() {
        let user = WebAppUser::from_json(
            r#"{"id":1,"username":"ada","language_code":"en","is_premium":true}"#,
        )
        .unwrap();

        assert_eq!(user.username(), Some("ada"));
        assert_eq!(user.language_code(), Some("en"));
        assert_eq!(user.last_name(), None);
        assert_eq!(user.get("is_premium"), Some(&json!(true)));
        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            json!({"id":1,"username":"ada","language_code":"en","is_premium":true})
        );
    }
}

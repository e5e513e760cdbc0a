use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::dao::models::user_stats_key;

pub const SNIPPET_PREFIX: &str = "snippet::";
pub const LANGUAGE_PREFIX: &str = "language::";
pub const SESSION_PREFIX: &str = "session::";
pub const USER_STATS_PREFIX: &str = "stats::";
pub const USER_PREFIX: &str = "user::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    #[allow(dead_code)]
    pub id: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

/// One page of a Mango `_find` query.
#[derive(Debug, Deserialize)]
pub struct FindResponse {
    pub docs: Vec<Value>,
    #[serde(default)]
    pub bookmark: Option<String>,
}

/// Mango index created on startup so `_find` queries avoid full scans.
pub struct IndexDefinition {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

pub const INDEXES: &[IndexDefinition] = &[
    IndexDefinition {
        name: "session-share-slug",
        fields: &["share_slug"],
    },
    IndexDefinition {
        name: "snippet-pool",
        fields: &["language", "volume", "difficulty"],
    },
    IndexDefinition {
        name: "stats-language",
        fields: &["language"],
    },
];

/// Selector restricting a Mango query to the documents of one id prefix.
pub fn prefix_selector(prefix: &str) -> Value {
    json!({ "_id": { "$gte": prefix, "$lt": format!("{prefix}{END_SUFFIX}") } })
}

/// Envelope adding CouchDB bookkeeping fields around a stored entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchDocument<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> CouchDocument<T> {
    pub fn new(id: String, body: T) -> Self {
        Self {
            id,
            rev: None,
            body,
        }
    }
}

pub fn snippet_doc_id(id: Uuid) -> String {
    format!("{SNIPPET_PREFIX}{id}")
}

pub fn language_doc_id(language: &str) -> String {
    format!("{LANGUAGE_PREFIX}{language}")
}

pub fn session_doc_id(id: Uuid) -> String {
    format!("{SESSION_PREFIX}{id}")
}

pub fn user_stats_doc_id(user_id: &str, language: &str) -> String {
    format!("{USER_STATS_PREFIX}{}", user_stats_key(user_id, language))
}

pub fn user_doc_id(id: &str) -> String {
    format!("{USER_PREFIX}{id}")
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;
    use crate::dao::models::{Role, UserEntity};

    #[test]
    fn envelope_flattens_entity_fields() {
        let user = UserEntity {
            id: "user-1".into(),
            display_name: "Ada".into(),
            role: Role::User,
            total_games: 0,
            average_score: 0.0,
            created_at: SystemTime::UNIX_EPOCH,
        };
        let document = CouchDocument::new(user_doc_id(&user.id), user.clone());
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["_id"], "user::user-1");
        assert!(value.get("_rev").is_none());
        assert_eq!(value["display_name"], "Ada");

        let parsed: CouchDocument<UserEntity> = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.body, user);
    }

    #[test]
    fn prefix_selector_bounds_ids() {
        let selector = prefix_selector(SESSION_PREFIX);
        assert_eq!(selector["_id"]["$gte"], "session::");
        assert_eq!(selector["_id"]["$lt"], "session::\u{ffff}");
    }

    #[test]
    fn stats_ids_combine_user_and_language() {
        assert_eq!(user_stats_doc_id("u1", "rust"), "stats::u1:rust");
    }
}

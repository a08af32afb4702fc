//! crates/party_content_core/src/domain.rs
//!
//! Defines the pure, core data structures for the party-game content layer.
//! These structs are independent of any database or storage backend; serde is
//! only derived so the local cache can persist them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

//=========================================================================================
// Identity
//=========================================================================================

/// Opaque identifier of a user, present only while a session exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity state of the running app. Exactly one variant holds at a time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionState {
    Anonymous(UserId),
    Authenticated(UserId),
    #[default]
    Unauthenticated,
}

impl SessionState {
    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            SessionState::Anonymous(id) | SessionState::Authenticated(id) => Some(id),
            SessionState::Unauthenticated => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

//=========================================================================================
// Content
//=========================================================================================

/// Identifier of a content item. Always assigned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Theme,
    Pair,
    QuestionSet,
}

impl ContentKind {
    pub const ALL: [ContentKind; 3] = [ContentKind::Theme, ContentKind::Pair, ContentKind::QuestionSet];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Theme => "theme",
            ContentKind::Pair => "pair",
            ContentKind::QuestionSet => "question_set",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One round of the question game: most players get `question`, the spy gets
/// `spy_question`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionPair {
    pub question: String,
    pub spy_question: String,
}

/// Kind-specific data of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentPayload {
    /// A named word list for the chameleon/spy games.
    Theme { name: String, words: Vec<String> },
    /// The two ends of a wavelength spectrum, e.g. "Hot" / "Cold".
    Pair { left: String, right: String },
    QuestionSet { name: String, questions: Vec<QuestionPair> },
}

impl ContentPayload {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentPayload::Theme { .. } => ContentKind::Theme,
            ContentPayload::Pair { .. } => ContentKind::Pair,
            ContentPayload::QuestionSet { .. } => ContentKind::QuestionSet,
        }
    }

    /// The display name used for uniqueness checks. Pairs have none.
    pub fn name(&self) -> Option<&str> {
        match self {
            ContentPayload::Theme { name, .. } | ContentPayload::QuestionSet { name, .. } => {
                Some(name)
            }
            ContentPayload::Pair { .. } => None,
        }
    }

    /// Checks the payload is something a player could actually use.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            ContentPayload::Theme { name, words } => {
                if name.trim().is_empty() {
                    return Err("theme name must not be blank".to_string());
                }
                if !words.iter().any(|w| !w.trim().is_empty()) {
                    return Err("theme needs at least one word".to_string());
                }
            }
            ContentPayload::Pair { left, right } => {
                if left.trim().is_empty() || right.trim().is_empty() {
                    return Err("both ends of a pair must be filled in".to_string());
                }
                if left.trim().eq_ignore_ascii_case(right.trim()) {
                    return Err("the two ends of a pair must differ".to_string());
                }
            }
            ContentPayload::QuestionSet { name, questions } => {
                if name.trim().is_empty() {
                    return Err("question set name must not be blank".to_string());
                }
                if questions.is_empty() {
                    return Err("question set needs at least one question pair".to_string());
                }
                if questions
                    .iter()
                    .any(|q| q.question.trim().is_empty() || q.spy_question.trim().is_empty())
                {
                    return Err("every question pair needs both questions".to_string());
                }
            }
        }
        Ok(())
    }
}

/// A theme, word pair or question set, either built-in or user-created.
///
/// `owner_id == None` means "built-in" when `is_custom` is false and
/// "created by an anonymous session" when it is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentId,
    pub is_custom: bool,
    pub owner_id: Option<UserId>,
    pub payload: ContentPayload,
    pub created_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        self.payload.kind()
    }
}

//=========================================================================================
// Local cache records
//=========================================================================================

/// A content item as stored on the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(flatten)]
    pub item: ContentItem,
    pub downloaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub completed: bool,
    pub downloaded_at: DateTime<Utc>,
    pub item_count: usize,
}

/// Per-kind record of basic-content downloads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DownloadStatus {
    pub kinds: BTreeMap<ContentKind, DownloadRecord>,
}

impl DownloadStatus {
    pub fn is_downloaded(&self, kind: ContentKind) -> bool {
        self.kinds.get(&kind).is_some_and(|r| r.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_with_kind_tag() {
        let payload = ContentPayload::Pair {
            left: "Hot".to_string(),
            right: "Cold".to_string(),
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["kind"], "pair");
        assert_eq!(ContentKind::parse("question_set"), Some(ContentKind::QuestionSet));
        assert_eq!(ContentKind::parse("bogus"), None);
    }

    #[test]
    fn validation_rejects_unusable_payloads() {
        let blank_theme = ContentPayload::Theme {
            name: "  ".to_string(),
            words: vec!["cat".to_string()],
        };
        assert!(blank_theme.validate().is_err());

        let empty_words = ContentPayload::Theme {
            name: "Animals".to_string(),
            words: vec![" ".to_string()],
        };
        assert!(empty_words.validate().is_err());

        let same_ends = ContentPayload::Pair {
            left: "Hot".to_string(),
            right: "hot".to_string(),
        };
        assert!(same_ends.validate().is_err());

        let set = ContentPayload::QuestionSet {
            name: "Icebreakers".to_string(),
            questions: vec![QuestionPair {
                question: "Favourite food?".to_string(),
                spy_question: "Favourite drink?".to_string(),
            }],
        };
        assert!(set.validate().is_ok());
    }

    #[test]
    fn cache_entry_flattens_item() {
        let entry = CacheEntry {
            item: ContentItem {
                id: ContentId::new("1"),
                is_custom: false,
                owner_id: None,
                payload: ContentPayload::Pair {
                    left: "Good".to_string(),
                    right: "Evil".to_string(),
                },
                created_at: Utc::now(),
            },
            downloaded_at: Utc::now(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], "1");
        let back: CacheEntry = serde_json::from_value(json).unwrap();
        assert_eq!(back, entry);
    }
}

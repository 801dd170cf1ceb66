//! Wire and storage types for flashcards and study sessions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single question/answer pair as it travels over the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub question: String,
    pub answer: String,
}

/// A flashcard as persisted, with identity and provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCard {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub question: String,
    pub answer: String,
    pub subject: String,
    pub created_at: DateTime<Utc>,
}

/// A named set of flashcards saved as one study session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudySession {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub session_name: String,
    pub flashcard_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Body of `POST /generate`.
///
/// The browser client only ever sends `notes`; `subject` and `num_cards`
/// are optional extras and stay off the wire when unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_cards: Option<usize>,
}

impl GenerateRequest {
    pub fn new(notes: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
            subject: None,
            num_cards: None,
        }
    }
}

/// Body of a successful `POST /generate` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub card_ids: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `GET /flashcards` and `GET /export/json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardListResponse {
    pub flashcards: Vec<StoredCard>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_omits_unset_fields() {
        let body = serde_json::to_string(&GenerateRequest::new("Mitochondria produce ATP."))
            .expect("serialize");
        assert_eq!(body, r#"{"notes":"Mitochondria produce ATP."}"#);
    }

    #[test]
    fn generate_request_carries_optional_fields_when_set() {
        let request = GenerateRequest {
            notes: "notes".into(),
            subject: Some("Biology".into()),
            num_cards: Some(3),
        };
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["subject"], "Biology");
        assert_eq!(value["num_cards"], 3);
    }

    #[test]
    fn generate_response_tolerates_missing_fields() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"cards":[{"question":"Q","answer":"A"}]}"#).expect("parse");
        assert_eq!(response.cards.len(), 1);
        assert!(response.card_ids.is_empty());
        assert!(response.message.is_none());
    }
}

//! End-to-end behavior of the flashcard page controller against a
//! scripted API, covering each visible state the page can end in.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use study_buddy::GenerateRequest;
use study_buddy::client::{
    FlashcardUi, GenerateApi, STATUS_DONE, STATUS_EMPTY, STATUS_PROMPT, STATUS_WORKING, UiSurface,
};

/// Plays back a fixed response and records every request body it receives.
struct MockApi {
    response: anyhow::Result<Value>,
    requests: Mutex<Vec<Value>>,
}

impl MockApi {
    fn returning(value: Value) -> Self {
        Self {
            response: Ok(value),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            response: Err(anyhow::anyhow!("{message}")),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerateApi for MockApi {
    async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<Value> {
        self.requests
            .lock()
            .unwrap()
            .push(serde_json::to_value(request)?);
        match &self.response {
            Ok(value) => Ok(value.clone()),
            Err(err) => Err(anyhow::anyhow!("{err}")),
        }
    }
}

/// Captures every status transition and rendered card.
#[derive(Default)]
struct RecordingSurface {
    statuses: Vec<String>,
    cards: Vec<String>,
    clears: usize,
}

impl UiSurface for RecordingSurface {
    fn set_status(&mut self, status: &str) {
        self.statuses.push(status.to_string());
    }

    fn clear_cards(&mut self) {
        self.clears += 1;
    }

    fn append_card(&mut self, text: &str) {
        self.cards.push(text.to_string());
    }
}

#[tokio::test]
async fn empty_notes_prompt_without_calling_the_api() {
    let ui = FlashcardUi::new(MockApi::returning(json!({"cards": []})));
    let mut surface = RecordingSurface::default();

    ui.generate("", &mut surface).await;
    ui.generate("   \n\t ", &mut surface).await;

    assert_eq!(surface.statuses, vec![STATUS_PROMPT, STATUS_PROMPT]);
    assert_eq!(surface.clears, 0);
    assert!(surface.cards.is_empty());
    assert_eq!(ui.api().request_count(), 0);
}

#[tokio::test]
async fn generated_cards_render_as_question_answer_blocks() {
    let ui = FlashcardUi::new(MockApi::returning(json!({
        "cards": [
            {"question": "What does photosynthesis convert?", "answer": "Light to energy"},
            {"question": "Where does it happen?", "answer": "In chloroplasts"},
        ]
    })));
    let mut surface = RecordingSurface::default();

    ui.generate("Photosynthesis converts light to energy.", &mut surface)
        .await;

    assert_eq!(surface.statuses, vec![STATUS_WORKING, STATUS_DONE]);
    assert_eq!(surface.clears, 1);
    assert_eq!(
        surface.cards,
        vec![
            "Q: What does photosynthesis convert?\n\nA: Light to energy",
            "Q: Where does it happen?\n\nA: In chloroplasts",
        ]
    );
}

#[tokio::test]
async fn request_body_carries_the_trimmed_notes_only() {
    let ui = FlashcardUi::new(MockApi::returning(json!({"cards": []})));
    let mut surface = RecordingSurface::default();

    ui.generate("  Photosynthesis converts light to energy.  ", &mut surface)
        .await;

    let requests = ui.api().requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0],
        json!({"notes": "Photosynthesis converts light to energy."})
    );
}

#[tokio::test]
async fn the_photosynthesis_example_end_to_end() {
    let ui = FlashcardUi::new(MockApi::returning(json!({
        "cards": [
            {"question": "What does photosynthesis convert?", "answer": "Light to energy"}
        ]
    })));
    let mut surface = RecordingSurface::default();

    ui.generate("Photosynthesis converts light to energy.", &mut surface)
        .await;

    let requests = ui.api().requests.lock().unwrap();
    assert_eq!(
        requests[0],
        json!({"notes": "Photosynthesis converts light to energy."})
    );
    assert_eq!(
        surface.cards,
        vec!["Q: What does photosynthesis convert?\n\nA: Light to energy"]
    );
    assert_eq!(surface.statuses.last().map(String::as_str), Some(STATUS_DONE));
}

#[tokio::test]
async fn empty_card_list_reports_no_flashcards() {
    let ui = FlashcardUi::new(MockApi::returning(json!({"cards": []})));
    let mut surface = RecordingSurface::default();

    ui.generate("Some notes.", &mut surface).await;

    assert_eq!(surface.statuses, vec![STATUS_WORKING, STATUS_EMPTY]);
    assert!(surface.cards.is_empty());
}

#[tokio::test]
async fn error_bodies_without_cards_report_no_flashcards() {
    // A JSON error payload still parses, so it takes the same branch the
    // page script would: no cards array means "nothing generated".
    let ui = FlashcardUi::new(MockApi::returning(json!({"error": "boom"})));
    let mut surface = RecordingSurface::default();

    ui.generate("Some notes.", &mut surface).await;

    assert_eq!(surface.statuses, vec![STATUS_WORKING, STATUS_EMPTY]);
}

#[tokio::test]
async fn transport_failures_surface_the_error_message() {
    let ui = FlashcardUi::new(MockApi::failing("connection refused"));
    let mut surface = RecordingSurface::default();

    ui.generate("Some notes.", &mut surface).await;

    assert_eq!(surface.statuses.len(), 2);
    assert_eq!(surface.statuses[0], STATUS_WORKING);
    assert!(surface.statuses[1].starts_with("Error: "));
    assert!(surface.statuses[1].contains("connection refused"));
    assert!(surface.cards.is_empty());
}

#[tokio::test]
async fn a_new_request_clears_previously_rendered_cards() {
    let ui = FlashcardUi::new(MockApi::returning(json!({
        "cards": [{"question": "Q1", "answer": "A1"}]
    })));
    let mut surface = RecordingSurface::default();

    ui.generate("First run.", &mut surface).await;
    ui.generate("Second run.", &mut surface).await;

    assert_eq!(surface.clears, 2);
    assert_eq!(surface.cards.len(), 2);
}

#[tokio::test]
async fn optional_fields_flow_through_generate_with() {
    let ui = FlashcardUi::new(MockApi::returning(json!({"cards": []})));
    let mut surface = RecordingSurface::default();

    let request = GenerateRequest {
        notes: "Cell biology notes.".to_string(),
        subject: Some("Biology".to_string()),
        num_cards: Some(4),
    };
    ui.generate_with(request, &mut surface).await;

    let requests = ui.api().requests.lock().unwrap();
    assert_eq!(
        requests[0],
        json!({
            "notes": "Cell biology notes.",
            "subject": "Biology",
            "num_cards": 4
        })
    );
}

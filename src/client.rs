//! Client-side controller for the study page
//!
//! `FlashcardUi` reproduces the browser page's behavior for terminal use:
//! trim the notes, post them to `/generate`, and render each returned card
//! as a `Q: ...\n\nA: ...` block. The HTTP status code is never inspected;
//! any body that parses as JSON flows through the cards/no-cards branches,
//! and only transport or parse failures reach the error branch.

use crate::cards::{CardListResponse, GenerateRequest};
use anyhow::{Context, Result};
use async_trait::async_trait;

pub const STATUS_PROMPT: &str = "Please paste some notes first.";
pub const STATUS_WORKING: &str = "Generating flashcards... (this may take a few seconds)";
pub const STATUS_DONE: &str = "Flashcards generated!";
pub const STATUS_EMPTY: &str = "No flashcards generated.";

/// Where the controller renders: one status line plus a list of card blocks.
pub trait UiSurface {
    fn set_status(&mut self, status: &str);
    fn clear_cards(&mut self);
    fn append_card(&mut self, text: &str);
}

/// Transport seam for the controller.
#[async_trait]
pub trait GenerateApi: Send + Sync {
    /// POST the notes and hand back the parsed JSON body, whatever the
    /// response status was.
    async fn generate(&self, request: &GenerateRequest) -> Result<serde_json::Value>;
}

// reqwest implementation talking to a running server
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to build reqwest client with timeout")?;
        let base_url = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch stored flashcards, optionally as a logged-in user.
    pub async fn list_cards(&self, token: Option<&str>) -> Result<CardListResponse> {
        let mut request = self.client.get(format!("{}/flashcards", self.base_url));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .context("Failed to send request to the flashcard server")?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Server error {}: {}", status, error_text);
        }
        response
            .json()
            .await
            .context("Failed to parse flashcard list")
    }

    /// Fetch the export payload for a format.
    pub async fn export(&self, format: &str) -> Result<serde_json::Value> {
        let response = self
            .client
            .get(format!("{}/export/{}", self.base_url, format))
            .send()
            .await
            .context("Failed to send request to the flashcard server")?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Server error {}: {}", status, error_text);
        }
        response.json().await.context("Failed to parse export")
    }
}

#[async_trait]
impl GenerateApi for HttpApi {
    async fn generate(&self, request: &GenerateRequest) -> Result<serde_json::Value> {
        let response = self
            .client
            .post(format!("{}/generate", self.base_url))
            .json(request)
            .send()
            .await
            .context("Failed to send request to the flashcard server")?;
        response
            .json()
            .await
            .context("Failed to parse server response as JSON")
    }
}

/// Drives one generate round-trip against a [`UiSurface`].
///
/// Nothing de-duplicates or cancels overlapping calls; when callers race,
/// the last one to finish wins the visible state.
pub struct FlashcardUi<A> {
    api: A,
}

impl<A: GenerateApi> FlashcardUi<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Handle one press of the generate button.
    pub async fn generate(&self, notes: &str, ui: &mut dyn UiSurface) {
        self.generate_with(GenerateRequest::new(notes), ui).await
    }

    /// Like [`generate`](Self::generate), with the optional request fields
    /// (subject, card count) filled in by the caller.
    pub async fn generate_with(&self, mut request: GenerateRequest, ui: &mut dyn UiSurface) {
        request.notes = request.notes.trim().to_string();
        if request.notes.is_empty() {
            ui.set_status(STATUS_PROMPT);
            return;
        }

        ui.set_status(STATUS_WORKING);
        ui.clear_cards();

        match self.api.generate(&request).await {
            Ok(body) => render_cards(&body, ui),
            Err(err) => ui.set_status(&format!("Error: {err}")),
        }
    }
}

/// The cards/no-cards branch over a parsed response body.
fn render_cards(body: &serde_json::Value, ui: &mut dyn UiSurface) {
    match body.get("cards").and_then(|v| v.as_array()) {
        Some(cards) if !cards.is_empty() => {
            for card in cards {
                let question = card
                    .get("question")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                let answer = card
                    .get("answer")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                ui.append_card(&format!("Q: {question}\n\nA: {answer}"));
            }
            ui.set_status(STATUS_DONE);
        }
        _ => ui.set_status(STATUS_EMPTY),
    }
}

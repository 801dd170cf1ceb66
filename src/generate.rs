use crate::cards::Card;
use crate::config::{Config, OpenAiConfig};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[async_trait]
pub trait CardGenerator: Send + Sync {
    async fn generate(&self, notes: &str, num_cards: usize) -> Result<Vec<Card>>;
    fn name(&self) -> &str;
}

// OpenAI chat-completions implementation
pub struct OpenAiGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
    retries: u32,
}

const SYSTEM_PROMPT: &str =
    "You are an educational assistant that creates effective flashcards from study materials.";

fn build_prompt(notes: &str, num_cards: usize) -> String {
    format!(
        "Create {num_cards} educational flashcards from the following study notes.\n\
         For each flashcard, provide a clear question and a comprehensive answer.\n\
         Format the response as a JSON array with 'question' and 'answer' fields.\n\
         \n\
         Study Notes:\n\
         {notes}\n\
         \n\
         Generate {num_cards} flashcards that cover the key concepts and important details."
    )
}

/// Pull a JSON array of cards out of free-form model output.
/// Models tend to wrap the array in prose, so everything between the first
/// `[` and the last `]` is treated as the payload.
fn extract_card_array(content: &str) -> Option<Vec<Card>> {
    let start = content.find('[')?;
    let end = content.rfind(']')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

impl OpenAiGenerator {
    pub fn new(api_key: String, openai: &OpenAiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(20))
            .build()
            .context("Failed to build reqwest client with timeout")?;

        Ok(Self {
            client,
            api_key,
            model: openai.model.clone(),
            base_url: openai.base_url.trim_end_matches('/').to_string(),
            max_tokens: openai.max_tokens,
            temperature: openai.temperature,
            retries: openai.retries,
        })
    }
}

#[async_trait]
impl CardGenerator for OpenAiGenerator {
    async fn generate(&self, notes: &str, num_cards: usize) -> Result<Vec<Card>> {
        debug!(
            "Requesting {} flashcards from OpenAI (model={}, chars={})",
            num_cards,
            self.model,
            notes.len()
        );

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(notes, num_cards)}
            ],
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
        });

        // Retry with simple exponential backoff
        let mut last_err: Option<anyhow::Error> = None;
        for i in 0..self.retries {
            let send_res = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await
                .context("Failed to send request to OpenAI API");
            let response = match send_res {
                Ok(resp) => resp,
                Err(e) => {
                    last_err = Some(e);
                    let delay_ms = 200u64 * (1u64 << i);
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                last_err = Some(anyhow::anyhow!(
                    "OpenAI API error {}: {}",
                    status,
                    error_text
                ));
                let delay_ms = 200u64 * (1u64 << i);
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                continue;
            }

            let parse_res: Result<serde_json::Value> = response
                .json()
                .await
                .context("Failed to parse OpenAI response");
            match parse_res {
                Ok(value) => {
                    let content = value["choices"][0]["message"]["content"]
                        .as_str()
                        .context("No content returned from OpenAI")?;
                    // Unusable content is a semantic failure, not a transport
                    // one; hand it to the fallback instead of retrying.
                    return extract_card_array(content)
                        .context("OpenAI response did not contain a flashcard array");
                }
                Err(e) => {
                    last_err = Some(e);
                    let delay_ms = 200u64 * (1u64 << i);
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Unknown OpenAI generation error")))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

// Deterministic, local generator for demo mode and as the failure fallback
pub struct HeuristicGenerator;

impl HeuristicGenerator {
    /// One card per non-blank sentence among the first `num_cards`
    /// sentence slots. Blank slots are skipped, not backfilled, so the
    /// result may hold fewer than `num_cards` cards.
    fn build(notes: &str, num_cards: usize) -> Vec<Card> {
        let mut cards = Vec::new();
        for sentence in notes.split('.').take(num_cards) {
            if sentence.trim().is_empty() {
                continue;
            }
            let prefix: String = sentence.chars().take(50).collect();
            cards.push(Card {
                question: format!("What is the key point about: {prefix}..."),
                answer: sentence.trim().to_string(),
            });
        }
        cards
    }
}

#[async_trait]
impl CardGenerator for HeuristicGenerator {
    async fn generate(&self, notes: &str, num_cards: usize) -> Result<Vec<Card>> {
        Ok(Self::build(notes, num_cards))
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Wraps a primary generator and falls back to heuristic cards whenever it
/// fails. Generation never surfaces an error to the caller.
pub struct FallbackGenerator {
    primary: Arc<dyn CardGenerator>,
}

impl FallbackGenerator {
    pub fn new(primary: Arc<dyn CardGenerator>) -> Self {
        Self { primary }
    }
}

#[async_trait]
impl CardGenerator for FallbackGenerator {
    async fn generate(&self, notes: &str, num_cards: usize) -> Result<Vec<Card>> {
        match self.primary.generate(notes, num_cards).await {
            Ok(cards) => Ok(cards),
            Err(e) => {
                warn!("Card generation failed, using heuristic cards: {e:#}");
                HeuristicGenerator.generate(notes, num_cards).await
            }
        }
    }

    fn name(&self) -> &str {
        self.primary.name()
    }
}

// Factory function to create a generator based on configuration
pub fn create_generator(config: &Config) -> Result<Arc<dyn CardGenerator>> {
    match config.openai_key() {
        Some(key) => {
            info!("Using OpenAI card generation (model={})", config.openai.model);
            let primary = OpenAiGenerator::new(key.to_string(), &config.openai)?;
            Ok(Arc::new(FallbackGenerator::new(Arc::new(primary))))
        }
        None => {
            info!("No OpenAI API key configured, using heuristic card generation");
            Ok(Arc::new(HeuristicGenerator))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingGenerator;

    #[async_trait]
    impl CardGenerator for FailingGenerator {
        async fn generate(&self, _notes: &str, _num_cards: usize) -> Result<Vec<Card>> {
            Err(anyhow::anyhow!("provider unavailable"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[test]
    fn extracts_card_array_wrapped_in_prose() {
        let content = r#"Here are your flashcards:
[
  {"question": "What is photosynthesis?", "answer": "The process by which plants convert sunlight into energy"},
  {"question": "Where does photosynthesis occur?", "answer": "In the chloroplasts of plant cells"}
]
Happy studying!"#;
        let cards = extract_card_array(content).expect("array present");
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].question, "What is photosynthesis?");
    }

    #[test]
    fn extraction_fails_without_a_valid_array() {
        assert!(extract_card_array("no json here").is_none());
        assert!(extract_card_array("] backwards [").is_none());
        assert!(extract_card_array("[{\"question\": truncated").is_none());
        assert!(extract_card_array("[{\"q\": \"wrong fields\"}]").is_none());
    }

    #[tokio::test]
    async fn heuristic_builds_one_card_per_sentence() {
        let notes = "Photosynthesis converts light to energy. It occurs in chloroplasts. \
                     The products are glucose and oxygen";
        let cards = HeuristicGenerator.generate(notes, 5).await.unwrap();
        assert_eq!(cards.len(), 3);
        assert!(cards[0].question.starts_with("What is the key point about: "));
        assert!(cards[0].question.ends_with("..."));
        assert_eq!(cards[1].answer, "It occurs in chloroplasts");
    }

    #[tokio::test]
    async fn heuristic_skips_blank_slots_without_backfilling() {
        // The second sentence slot is blank, so only one card comes back
        // even though a third non-blank sentence exists.
        let notes = "First point. . Third point. Fourth point.";
        let cards = HeuristicGenerator.generate(notes, 2).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].answer, "First point");
    }

    #[tokio::test]
    async fn heuristic_truncates_long_sentences_by_characters() {
        let long = "a".repeat(80);
        let cards = HeuristicGenerator.generate(&long, 5).await.unwrap();
        assert_eq!(cards.len(), 1);
        let expected = format!("What is the key point about: {}...", "a".repeat(50));
        assert_eq!(cards[0].question, expected);
    }

    #[tokio::test]
    async fn heuristic_handles_multibyte_text() {
        let notes = "光合作用は植物がエネルギーを作る過程です";
        let cards = HeuristicGenerator.generate(notes, 5).await.unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].answer, notes);
    }

    #[tokio::test]
    async fn heuristic_yields_nothing_for_blank_notes() {
        let cards = HeuristicGenerator.generate("   ", 5).await.unwrap();
        assert!(cards.is_empty());
    }

    #[tokio::test]
    async fn fallback_covers_primary_failure() {
        let generator = FallbackGenerator::new(Arc::new(FailingGenerator));
        let cards = generator
            .generate("Mitochondria produce ATP. They have two membranes.", 5)
            .await
            .unwrap();
        assert_eq!(cards.len(), 2);
        assert_eq!(generator.name(), "failing");
    }
}

//! AI study buddy: flashcard generation service and client.
//!
//! The server side turns pasted study notes into question/answer flashcards
//! (OpenAI-backed with a deterministic heuristic fallback), stores them in
//! SQLite, and exposes the whole thing over HTTP. The client side drives the
//! same `/generate` endpoint from a terminal, rendering the page's card
//! blocks and status lines.

pub mod auth;
pub mod cards;
pub mod client;
pub mod config;
pub mod error;
pub mod generate;
pub mod http;
pub mod storage;

pub use cards::{Card, GenerateRequest, GenerateResponse};
pub use config::Config;
pub use error::{Result, StudyBuddyError};

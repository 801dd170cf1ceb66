//! SQLite persistence for flashcards, study sessions, users, and login sessions

use crate::auth::AuthUser;
use crate::cards::{Card, StoredCard, StudySession};
use crate::error::Result;
use crate::error::StudyBuddyError;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS flashcards (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    question TEXT NOT NULL,
    answer TEXT NOT NULL,
    subject TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS study_sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT,
    session_name TEXT,
    flashcard_ids TEXT,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT UNIQUE NOT NULL,
    email TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_login TEXT
);
CREATE TABLE IF NOT EXISTS user_sessions (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    session_token TEXT UNIQUE NOT NULL,
    expires_at TEXT NOT NULL,
    created_at TEXT NOT NULL
);
";

/// A stored user row, as needed for credential checks.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
}

/// Row counts reported by the status endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StorageCounts {
    pub flashcards: i64,
    pub sessions: i64,
    pub users: i64,
}

/// Shared handle to the SQLite database.
#[derive(Clone)]
pub struct CardStore {
    conn: Arc<Mutex<Connection>>,
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

type CardRow = (String, Option<String>, String, String, String, String);

fn card_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CardRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

impl CardStore {
    /// Open (or create) the database at `path` and make sure the schema exists.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        debug!("Opened flashcard database at {}", path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database, used by demo mode and tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Persist generated cards and return their new ids, in input order.
    pub async fn insert_cards(
        &self,
        cards: &[Card],
        subject: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<String>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let now = Utc::now().to_rfc3339();
        let mut ids = Vec::with_capacity(cards.len());
        for card in cards {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                "INSERT INTO flashcards (id, user_id, question, answer, subject, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, user_id, card.question, card.answer, subject, now],
            )?;
            ids.push(id);
        }
        tx.commit()?;
        Ok(ids)
    }

    /// All stored cards, newest first. With a user id, only that user's cards.
    pub async fn list_cards(&self, user_id: Option<&str>) -> Result<Vec<StoredCard>> {
        let conn = self.conn.lock().await;
        let rows: Vec<CardRow> = match user_id {
            Some(uid) => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, question, answer, subject, created_at
                     FROM flashcards WHERE user_id = ?1 ORDER BY created_at DESC",
                )?;
                let mapped = stmt.query_map(params![uid], card_row)?;
                mapped.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, question, answer, subject, created_at
                     FROM flashcards ORDER BY created_at DESC",
                )?;
                let mapped = stmt.query_map([], card_row)?;
                mapped.collect::<rusqlite::Result<_>>()?
            }
        };

        let mut cards = Vec::with_capacity(rows.len());
        for (id, user_id, question, answer, subject, created_at) in rows {
            cards.push(StoredCard {
                id,
                user_id,
                question,
                answer,
                subject,
                created_at: parse_timestamp(&created_at)?,
            });
        }
        Ok(cards)
    }

    /// Persist a study session and return it as stored.
    pub async fn save_session(
        &self,
        session_name: &str,
        flashcard_ids: &[String],
        user_id: Option<&str>,
    ) -> Result<StudySession> {
        let conn = self.conn.lock().await;
        let session = StudySession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.map(str::to_string),
            session_name: session_name.to_string(),
            flashcard_ids: flashcard_ids.to_vec(),
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO study_sessions (id, user_id, session_name, flashcard_ids, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                session.id,
                session.user_id,
                session.session_name,
                serde_json::to_string(&session.flashcard_ids)?,
                session.created_at.to_rfc3339()
            ],
        )?;
        Ok(session)
    }

    /// Create a user, rejecting duplicate usernames and emails.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        salt: &str,
    ) -> Result<String> {
        let conn = self.conn.lock().await;
        let existing: Option<String> = conn
            .query_row(
                "SELECT id FROM users WHERE username = ?1 OR email = ?2",
                params![username, email],
                |row| row.get(0),
            )
            .optional()?;
        if existing.is_some() {
            return Err(StudyBuddyError::Validation {
                message: "Username or email already exists".to_string(),
            });
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, salt, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                id,
                username,
                email,
                password_hash,
                salt,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(id)
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock().await;
        let record = conn
            .query_row(
                "SELECT id, username, email, password_hash, salt FROM users WHERE username = ?1",
                params![username],
                |row| {
                    Ok(UserRecord {
                        id: row.get(0)?,
                        username: row.get(1)?,
                        email: row.get(2)?,
                        password_hash: row.get(3)?,
                        salt: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    pub async fn touch_last_login(&self, user_id: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), user_id],
        )?;
        Ok(())
    }

    /// Record a login session for `user_id` under an opaque token.
    pub async fn create_auth_session(
        &self,
        user_id: &str,
        session_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO user_sessions (id, user_id, session_token, expires_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                user_id,
                session_token,
                expires_at.to_rfc3339(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Resolve a session token to its user, ignoring expired sessions.
    pub async fn verify_auth_session(&self, session_token: &str) -> Result<Option<AuthUser>> {
        let conn = self.conn.lock().await;
        let row: Option<(String, String, String, String)> = conn
            .query_row(
                "SELECT u.id, u.username, u.email, s.expires_at
                 FROM user_sessions s JOIN users u ON u.id = s.user_id
                 WHERE s.session_token = ?1",
                params![session_token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((user_id, username, email, expires_at)) = row else {
            return Ok(None);
        };
        if parse_timestamp(&expires_at)? <= Utc::now() {
            return Ok(None);
        }
        Ok(Some(AuthUser {
            user_id,
            username,
            email,
        }))
    }

    pub async fn delete_auth_session(&self, session_token: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "DELETE FROM user_sessions WHERE session_token = ?1",
            params![session_token],
        )?;
        Ok(())
    }

    pub async fn counts(&self) -> Result<StorageCounts> {
        let conn = self.conn.lock().await;
        let flashcards = conn.query_row("SELECT COUNT(*) FROM flashcards", [], |r| r.get(0))?;
        let sessions = conn.query_row("SELECT COUNT(*) FROM study_sessions", [], |r| r.get(0))?;
        let users = conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?;
        Ok(StorageCounts {
            flashcards,
            sessions,
            users,
        })
    }
}

// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! SQLite storage for submitted ideas

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::idea::{Idea, NewIdea};
use crate::{IdeaBoardError, Result};

const IDEA_COLUMNS: &str =
    "id, title, description, category, tags, author_name, is_approved, is_nsfw, created_at";

/// Idea store (thread-safe wrapper)
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

/// Store statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: i64,
    pub visible: i64,
    pub categories: Vec<(String, i64)>,
}

impl Database {
    /// Open or create the database
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.initialize()?;
        Ok(db)
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| IdeaBoardError::Store("Database lock poisoned".to_string()))
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS ai_ideas (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                author_name TEXT,
                is_approved INTEGER NOT NULL DEFAULT 1,
                is_nsfw INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_ideas_created ON ai_ideas(created_at);
            CREATE INDEX IF NOT EXISTS idx_ideas_category ON ai_ideas(category);
        "#,
        )?;
        Ok(())
    }

    /// Insert a new idea, approved and not flagged
    pub fn insert_idea(&self, new_idea: &NewIdea) -> Result<Idea> {
        let idea = Idea {
            id: Uuid::new_v4().to_string(),
            title: new_idea.title.clone(),
            description: new_idea.description.clone(),
            category: new_idea.category.to_string(),
            tags: new_idea.tags.clone(),
            author_name: new_idea.author_name.clone(),
            is_approved: true,
            is_nsfw: false,
            created_at: Utc::now(),
        };

        let conn = self.lock_conn()?;
        let tags_json = serde_json::to_string(&idea.tags)?;
        conn.execute(
            r#"INSERT INTO ai_ideas (id, title, description, category, tags, author_name, is_approved, is_nsfw, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"#,
            params![
                idea.id,
                idea.title,
                idea.description,
                idea.category,
                tags_json,
                idea.author_name,
                idea.is_approved,
                idea.is_nsfw,
                format_timestamp(&idea.created_at),
            ],
        )?;

        Ok(idea)
    }

    /// Approved, non-NSFW ideas, newest first
    pub fn list_visible(&self) -> Result<Vec<Idea>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ai_ideas WHERE is_approved = 1 AND is_nsfw = 0 \
             ORDER BY created_at DESC, rowid DESC",
            IDEA_COLUMNS
        ))?;
        let ideas = stmt
            .query_map([], idea_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ideas)
    }

    /// Every idea regardless of moderation flags, newest first
    pub fn list_all(&self) -> Result<Vec<Idea>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM ai_ideas ORDER BY created_at DESC, rowid DESC",
            IDEA_COLUMNS
        ))?;
        let ideas = stmt
            .query_map([], idea_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ideas)
    }

    pub fn get_idea(&self, id: &str) -> Result<Option<Idea>> {
        let conn = self.lock_conn()?;
        let idea = conn
            .query_row(
                &format!("SELECT {} FROM ai_ideas WHERE id = ?1", IDEA_COLUMNS),
                params![id],
                idea_from_row,
            )
            .optional()?;
        Ok(idea)
    }

    /// Change moderation flags on a stored idea; false when the id is unknown
    pub fn set_flags(&self, id: &str, is_approved: bool, is_nsfw: bool) -> Result<bool> {
        let conn = self.lock_conn()?;
        let changed = conn.execute(
            "UPDATE ai_ideas SET is_approved = ?2, is_nsfw = ?3 WHERE id = ?1",
            params![id, is_approved, is_nsfw],
        )?;
        Ok(changed > 0)
    }

    /// Get store statistics
    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock_conn()?;
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM ai_ideas", [], |row| row.get(0))?;
        let visible: i64 = conn.query_row(
            "SELECT COUNT(*) FROM ai_ideas WHERE is_approved = 1 AND is_nsfw = 0",
            [],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) AS cnt FROM ai_ideas GROUP BY category ORDER BY cnt DESC, category",
        )?;
        let categories = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(StoreStats {
            total,
            visible,
            categories,
        })
    }

    /// Vacuum database
    pub fn vacuum(&self) -> Result<()> {
        let conn = self.lock_conn()?;
        conn.execute("VACUUM", [])?;
        Ok(())
    }
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    // Fixed width keeps lexical order equal to time order
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_tags(raw: &str) -> Vec<String> {
    if raw.trim().is_empty() {
        return Vec::new();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!("Ignoring malformed tags column {:?}: {}", raw, e);
        Vec::new()
    })
}

fn idea_from_row(row: &Row<'_>) -> rusqlite::Result<Idea> {
    let tags: String = row.get(4)?;
    let created: String = row.get(8)?;
    Ok(Idea {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        tags: decode_tags(&tags),
        author_name: row.get(5)?,
        is_approved: row.get(6)?,
        is_nsfw: row.get(7)?,
        created_at: DateTime::parse_from_rfc3339(&created)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
            })?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::idea::Category;

    fn new_idea(title: &str, tags: &[&str]) -> NewIdea {
        NewIdea {
            title: title.to_string(),
            description: "A sufficiently long description".to_string(),
            category: Category::Education,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            author_name: None,
        }
    }

    #[test]
    fn test_insert_sets_flags_and_round_trips() {
        let db = Database::in_memory().unwrap();
        let idea = db.insert_idea(&new_idea("Tutor bot", &["AI", "Chatbot"])).unwrap();

        assert!(idea.is_approved);
        assert!(!idea.is_nsfw);
        assert_eq!(idea.category, "Education");

        let stored = db.get_idea(&idea.id).unwrap().unwrap();
        assert_eq!(stored.tags, vec!["AI", "Chatbot"]);
        assert_eq!(stored.author_name, None);
        assert_eq!(stored.created_at.timestamp_micros(), idea.created_at.timestamp_micros());
    }

    #[test]
    fn test_list_visible_newest_first() {
        let db = Database::in_memory().unwrap();
        let first = db.insert_idea(&new_idea("First", &[])).unwrap();
        let second = db.insert_idea(&new_idea("Second", &[])).unwrap();

        let ids: Vec<_> = db.list_visible().unwrap().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_hidden_ideas_excluded() {
        let db = Database::in_memory().unwrap();
        let shown = db.insert_idea(&new_idea("Shown", &[])).unwrap();
        let flagged = db.insert_idea(&new_idea("Flagged", &[])).unwrap();
        let pending = db.insert_idea(&new_idea("Pending", &[])).unwrap();

        assert!(db.set_flags(&flagged.id, true, true).unwrap());
        assert!(db.set_flags(&pending.id, false, false).unwrap());
        assert!(!db.set_flags("missing", true, false).unwrap());

        let visible = db.list_visible().unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, shown.id);
        assert_eq!(db.list_all().unwrap().len(), 3);

        let stats = db.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.visible, 1);
        assert_eq!(stats.categories, vec![("Education".to_string(), 3)]);
    }

    #[test]
    fn test_malformed_tags_column_decodes_empty() {
        let db = Database::in_memory().unwrap();
        let idea = db.insert_idea(&new_idea("Tags", &["AI"])).unwrap();
        {
            let conn = db.lock_conn().unwrap();
            conn.execute("UPDATE ai_ideas SET tags = 'not json' WHERE id = ?1", params![idea.id])
                .unwrap();
        }
        assert!(db.get_idea(&idea.id).unwrap().unwrap().tags.is_empty());
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ideas.db");

        let id = {
            let db = Database::open(&path).unwrap();
            db.insert_idea(&new_idea("Persisted", &["NLP"])).unwrap().id
        };

        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_idea(&id).unwrap().unwrap().title, "Persisted");
        db.vacuum().unwrap();
    }
}

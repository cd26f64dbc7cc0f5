//! `SQLite` catalog: schema, containment matching, and panel reads.
//!
//! The catalog stands in for the CMS database: documents and accounts are
//! the searchable corpus, favorites and history back the idle/browse panels.
//! Matching here is deliberately dumb (escaped `LIKE` containment, capped,
//! unordered); relevance ordering is computed by the ranker so it is
//! identical regardless of which storage executed the match.

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::model::types::{PanelEntry, Status};

/// A document row as stored, before normalization into a `ResultItem`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentRecord {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub status: Status,
    pub author_id: i64,
    pub created_at: Option<i64>,
    pub modified_at: Option<i64>,
}

/// An account row as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRecord {
    pub id: i64,
    pub login: String,
    pub email: String,
    pub display_name: String,
    pub role_label: Option<String>,
}

/// Seed file shape accepted by `qpal seed`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub documents: Vec<SeedDocument>,
    #[serde(default)]
    pub accounts: Vec<SeedAccount>,
    #[serde(default)]
    pub favorites: Vec<PanelEntry>,
    #[serde(default)]
    pub history: Vec<PanelEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedDocument {
    pub category: String,
    pub title: String,
    pub status: String,
    pub author_id: i64,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub modified_at: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeedAccount {
    pub login: String,
    pub email: String,
    pub display_name: String,
    #[serde(default)]
    pub role_label: Option<String>,
}

/// Thread-safe handle over the catalog database.
pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    /// Open (creating if needed) the catalog at `path` and apply the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("opening catalog at {}", path.display()))?;
        let catalog = Self {
            conn: Mutex::new(conn),
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// In-memory catalog for tests.
    pub fn open_in_memory() -> Result<Self> {
        let catalog = Self {
            conn: Mutex::new(Connection::open_in_memory()?),
        };
        catalog.init_schema()?;
        Ok(catalog)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;

             CREATE TABLE IF NOT EXISTS documents (
                 id          INTEGER PRIMARY KEY,
                 category    TEXT NOT NULL,
                 title       TEXT NOT NULL,
                 status      TEXT NOT NULL,
                 author_id   INTEGER NOT NULL,
                 created_at  INTEGER,
                 modified_at INTEGER
             );
             CREATE INDEX IF NOT EXISTS idx_documents_category
                 ON documents(category, status);

             CREATE TABLE IF NOT EXISTS accounts (
                 id           INTEGER PRIMARY KEY,
                 login        TEXT NOT NULL UNIQUE,
                 email        TEXT NOT NULL,
                 display_name TEXT NOT NULL,
                 role_label   TEXT
             );

             CREATE TABLE IF NOT EXISTS favorites (
                 id       INTEGER PRIMARY KEY,
                 kind     TEXT NOT NULL,
                 item_id  TEXT NOT NULL,
                 title    TEXT NOT NULL,
                 locator  TEXT NOT NULL,
                 position INTEGER NOT NULL DEFAULT 0
             );

             CREATE TABLE IF NOT EXISTS history (
                 id         INTEGER PRIMARY KEY,
                 kind       TEXT NOT NULL,
                 item_id    TEXT NOT NULL,
                 title      TEXT NOT NULL,
                 locator    TEXT NOT NULL,
                 visited_at INTEGER NOT NULL
             );",
        )?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Ingest
    // ---------------------------------------------------------------------

    pub fn insert_document(
        &self,
        category: &str,
        title: &str,
        status: Status,
        author_id: i64,
        created_at: Option<i64>,
        modified_at: Option<i64>,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO documents (category, title, status, author_id, created_at, modified_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                category,
                title,
                status.as_db_str(),
                author_id,
                created_at,
                modified_at
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_account(
        &self,
        login: &str,
        email: &str,
        display_name: &str,
        role_label: Option<&str>,
    ) -> Result<i64> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO accounts (login, email, display_name, role_label)
             VALUES (?1, ?2, ?3, ?4)",
            params![login, email, display_name, role_label],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn insert_favorite(&self, entry: &PanelEntry, position: i64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO favorites (kind, item_id, title, locator, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![entry.kind, entry.id, entry.title, entry.locator, position],
        )?;
        Ok(())
    }

    pub fn insert_history(&self, entry: &PanelEntry) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO history (kind, item_id, title, locator, visited_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.kind,
                entry.id,
                entry.title,
                entry.locator,
                entry.visited_at.unwrap_or(0)
            ],
        )?;
        Ok(())
    }

    /// Load a JSON seed file into the catalog.
    pub fn seed(&self, seed: &SeedFile) -> Result<usize> {
        let mut count = 0usize;
        for doc in &seed.documents {
            let status = Status::from_db_str(&doc.status)
                .with_context(|| format!("unknown document status {:?}", doc.status))?;
            self.insert_document(
                &doc.category,
                &doc.title,
                status,
                doc.author_id,
                doc.created_at,
                doc.modified_at,
            )?;
            count += 1;
        }
        for acct in &seed.accounts {
            self.insert_account(
                &acct.login,
                &acct.email,
                &acct.display_name,
                acct.role_label.as_deref(),
            )?;
            count += 1;
        }
        for (pos, fav) in seed.favorites.iter().enumerate() {
            self.insert_favorite(fav, pos as i64)?;
            count += 1;
        }
        for entry in &seed.history {
            self.insert_history(entry)?;
            count += 1;
        }
        info!(entries = count, "seeded catalog");
        Ok(count)
    }

    // ---------------------------------------------------------------------
    // Containment matching (unordered, capped)
    // ---------------------------------------------------------------------

    /// Title-only containment match within one category, constrained to the
    /// given status set. Returned order is arbitrary but deterministic.
    pub fn match_documents(
        &self,
        category: &str,
        term: &str,
        statuses: &[Status],
        cap: usize,
    ) -> Result<Vec<DocumentRecord>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = (0..statuses.len())
            .map(|i| format!("?{}", i + 3))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT id, category, title, status, author_id, created_at, modified_at
             FROM documents
             WHERE category = ?1
               AND title LIKE ?2 ESCAPE '\\'
               AND status IN ({placeholders})
             ORDER BY id
             LIMIT {cap}"
        );

        let like = containment_pattern(term);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let mut bindings: Vec<&dyn rusqlite::ToSql> = vec![&category, &like];
        let status_strs: Vec<&str> = statuses.iter().map(|s| s.as_db_str()).collect();
        for s in &status_strs {
            bindings.push(s);
        }

        let rows = stmt.query_map(rusqlite::params_from_iter(bindings), |row| {
            Ok(DocumentRecord {
                id: row.get(0)?,
                category: row.get(1)?,
                title: row.get(2)?,
                status: Status::from_db_str(&row.get::<_, String>(3)?)
                    .unwrap_or(Status::Published),
                author_id: row.get(4)?,
                created_at: row.get(5)?,
                modified_at: row.get(6)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// Containment match over login, email, and display name in one pass.
    pub fn match_accounts(&self, term: &str, cap: usize) -> Result<Vec<AccountRecord>> {
        let like = containment_pattern(term);
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT id, login, email, display_name, role_label
             FROM accounts
             WHERE login LIKE ?1 ESCAPE '\\'
                OR email LIKE ?1 ESCAPE '\\'
                OR display_name LIKE ?1 ESCAPE '\\'
             ORDER BY id
             LIMIT {cap}"
        ))?;
        let rows = stmt.query_map(params![like], |row| {
            Ok(AccountRecord {
                id: row.get(0)?,
                login: row.get(1)?,
                email: row.get(2)?,
                display_name: row.get(3)?,
                role_label: row.get(4)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    // ---------------------------------------------------------------------
    // Idle panels (read-only to the search core)
    // ---------------------------------------------------------------------

    pub fn favorites(&self, limit: usize) -> Result<Vec<PanelEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT kind, item_id, title, locator
             FROM favorites ORDER BY position LIMIT {limit}"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(PanelEntry {
                kind: row.get(0)?,
                id: row.get(1)?,
                title: row.get(2)?,
                locator: row.get(3)?,
                visited_at: None,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn recents(&self, limit: usize) -> Result<Vec<PanelEntry>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT kind, item_id, title, locator, visited_at
             FROM history ORDER BY visited_at DESC LIMIT {limit}"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok(PanelEntry {
                kind: row.get(0)?,
                id: row.get(1)?,
                title: row.get(2)?,
                locator: row.get(3)?,
                visited_at: row.get(4)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

/// Build a `%term%` pattern with `%`, `_`, and `\` escaped so user input
/// matches literally.
fn containment_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with_docs() -> Catalog {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog
            .insert_document("article", "Hello World", Status::Published, 1, None, None)
            .unwrap();
        catalog
            .insert_document("article", "Hidden Draft", Status::Draft, 2, None, None)
            .unwrap();
        catalog
            .insert_document("page", "World Atlas", Status::Published, 1, None, None)
            .unwrap();
        catalog
    }

    #[test]
    fn document_match_is_scoped_to_category_and_status() {
        let catalog = catalog_with_docs();
        let hits = catalog
            .match_documents("article", "world", &[Status::Published], 8)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Hello World");

        let hits = catalog
            .match_documents("article", "hidden", &[Status::Published], 8)
            .unwrap();
        assert!(hits.is_empty());

        let hits = catalog
            .match_documents("article", "hidden", &[Status::Published, Status::Draft], 8)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn document_match_is_case_insensitive() {
        let catalog = catalog_with_docs();
        let hits = catalog
            .match_documents("article", "HELLO", &[Status::Published], 8)
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn like_metacharacters_match_literally() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog
            .insert_document("article", "100% Done", Status::Published, 1, None, None)
            .unwrap();
        catalog
            .insert_document("article", "1000 Done", Status::Published, 1, None, None)
            .unwrap();
        let hits = catalog
            .match_documents("article", "100%", &[Status::Published], 8)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% Done");
    }

    #[test]
    fn document_cap_is_applied() {
        let catalog = Catalog::open_in_memory().unwrap();
        for i in 0..12 {
            catalog
                .insert_document(
                    "article",
                    &format!("widget {i}"),
                    Status::Published,
                    1,
                    None,
                    None,
                )
                .unwrap();
        }
        let hits = catalog
            .match_documents("article", "widget", &[Status::Published], 8)
            .unwrap();
        assert_eq!(hits.len(), 8);
    }

    #[test]
    fn account_match_spans_three_fields() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog
            .insert_account("anna", "anna@example.com", "Anna Ng", Some("Editor"))
            .unwrap();
        catalog
            .insert_account("bob", "banner@example.com", "Bob Lee", None)
            .unwrap();
        catalog
            .insert_account("carol", "carol@example.com", "Ann-Marie", None)
            .unwrap();

        let hits = catalog.match_accounts("ann", 20).unwrap();
        let logins: Vec<_> = hits.iter().map(|a| a.login.as_str()).collect();
        // anna by login, bob by email, carol by display name.
        assert_eq!(logins, vec!["anna", "bob", "carol"]);
    }

    #[test]
    fn panels_read_back_in_order() {
        let catalog = Catalog::open_in_memory().unwrap();
        let fav = PanelEntry {
            kind: "documents".into(),
            id: "1".into(),
            title: "Pinned".into(),
            locator: "documents/1/edit".into(),
            visited_at: None,
        };
        catalog.insert_favorite(&fav, 0).unwrap();
        let older = PanelEntry {
            kind: "documents".into(),
            id: "2".into(),
            title: "Older".into(),
            locator: "documents/2/edit".into(),
            visited_at: Some(100),
        };
        let newer = PanelEntry {
            kind: "admin".into(),
            id: "settings-general".into(),
            title: "General Settings".into(),
            locator: "settings/general".into(),
            visited_at: Some(200),
        };
        catalog.insert_history(&older).unwrap();
        catalog.insert_history(&newer).unwrap();

        assert_eq!(catalog.favorites(10).unwrap().len(), 1);
        let recents = catalog.recents(10).unwrap();
        assert_eq!(recents[0].title, "General Settings");
        assert_eq!(recents[1].title, "Older");
    }

    #[test]
    fn containment_pattern_escapes() {
        assert_eq!(containment_pattern("a%b_c\\d"), "%a\\%b\\_c\\\\d%");
    }
}

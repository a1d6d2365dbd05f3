//! SQLite-backed sheet with zstd-compressed body cells

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rusqlite_migration::{M, Migrations};

use super::traits::{CheckpointStore, Placement, SheetLayout, SheetStore, SortOrder};
use crate::models::{
    Direction, Folder, MessageId, NormalizedRecord, ReadState, SyncCheckpoint, ThreadId,
};

/// Database migrations
///
/// Each migration is applied in order. The user_version pragma tracks which
/// migrations have been applied.
fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        // Migration 1: Initial schema
        M::up(
            r#"
            -- Output rows; position gives display order
            CREATE TABLE records (
                id INTEGER PRIMARY KEY,
                position INTEGER NOT NULL,
                message_id TEXT NOT NULL,
                thread_id TEXT NOT NULL,
                ts INTEGER NOT NULL,
                from_name TEXT NOT NULL,
                from_email TEXT NOT NULL,
                to_addrs TEXT NOT NULL,
                cc_addrs TEXT NOT NULL,
                bcc_addrs TEXT NOT NULL,
                subject TEXT NOT NULL,
                snippet BLOB NOT NULL,     -- zstd compressed
                links TEXT NOT NULL,
                direction TEXT NOT NULL,
                folder TEXT NOT NULL,
                read_state TEXT NOT NULL,
                labels TEXT NOT NULL,
                plain_text BLOB NOT NULL,  -- zstd compressed
                html_body BLOB NOT NULL,   -- zstd compressed
                links_full TEXT NOT NULL,
                attachments TEXT NOT NULL
            );

            CREATE INDEX idx_records_position ON records(position);
            CREATE INDEX idx_records_message_id ON records(message_id);

            -- Message IDs already materialized as rows
            CREATE TABLE dedup_index (
                message_id TEXT PRIMARY KEY
            );

            -- Cursors and secrets (key/value)
            CREATE TABLE properties (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        ),
        // Migration 2: Header row presentation
        M::up(
            r#"
            CREATE TABLE sheet_layout (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                headers TEXT NOT NULL,  -- JSON array
                frozen_rows INTEGER NOT NULL,
                filter INTEGER NOT NULL
            );
            "#,
        ),
    ])
}

const KEY_PAGE_TOKEN: &str = "fullscan_page_token";
const KEY_HISTORY_ID: &str = "history_id";
const KEY_LAST_SEEN_TS: &str = "last_seen_ts";
const KEY_RUN_TOKEN: &str = "run_token";

const RECORD_COLUMNS: &str = "message_id, thread_id, ts, from_name, from_email, to_addrs, \
     cc_addrs, bcc_addrs, subject, snippet, links, direction, folder, read_state, labels, \
     plain_text, html_body, links_full, attachments";

/// SQLite implementation of [`SheetStore`] and [`CheckpointStore`]
pub struct SqliteSheetStore {
    conn: Mutex<Connection>,
}

impl SqliteSheetStore {
    /// Open (or create) the database at `db_path` and bring its schema up to date
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open database at {:?}", db_path.as_ref()))?;

        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA temp_store = MEMORY;
            "#,
        )?;

        migrations()
            .to_latest(&mut conn)
            .context("Failed to run database migrations")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn get_property(conn: &Connection, key: &str) -> Result<Option<String>> {
        Ok(conn
            .query_row("SELECT value FROM properties WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn set_property(conn: &Connection, key: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(value) => conn.execute(
                "INSERT INTO properties (key, value) VALUES (?, ?)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?,
            None => conn.execute("DELETE FROM properties WHERE key = ?", [key])?,
        };
        Ok(())
    }
}

fn compress(text: &str, column: &str) -> Result<Vec<u8>> {
    // Level 3 = good balance of speed vs compression
    zstd::encode_all(text.as_bytes(), 3).with_context(|| format!("Failed to compress {}", column))
}

fn decompress(idx: usize, data: &[u8]) -> rusqlite::Result<String> {
    zstd::decode_all(data)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Blob, Box::new(e))
        })
}

fn parse_column<T>(idx: usize, value: String, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unexpected value {:?}", value).into(),
        )
    })
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<NormalizedRecord> {
    let ts: i64 = row.get(2)?;
    let snippet: Vec<u8> = row.get(9)?;
    let plain_text: Vec<u8> = row.get(15)?;
    let html_body: Vec<u8> = row.get(16)?;

    Ok(NormalizedRecord {
        message_id: MessageId::new(row.get::<_, String>(0)?),
        thread_id: ThreadId::new(row.get::<_, String>(1)?),
        date: Utc.timestamp_millis_opt(ts).single().unwrap_or_default(),
        from_name: row.get(3)?,
        from_email: row.get(4)?,
        to: row.get(5)?,
        cc: row.get(6)?,
        bcc: row.get(7)?,
        subject: row.get(8)?,
        snippet: decompress(9, &snippet)?,
        links: row.get(10)?,
        direction: parse_column(11, row.get(11)?, Direction::parse)?,
        folder: parse_column(12, row.get(12)?, Folder::parse)?,
        read_state: parse_column(13, row.get(13)?, ReadState::parse)?,
        labels: row.get(14)?,
        plain_text: decompress(15, &plain_text)?,
        html_body: decompress(16, &html_body)?,
        links_full: row.get(17)?,
        attachments: row.get(18)?,
    })
}

impl SheetStore for SqliteSheetStore {
    fn ensure_layout(&self) -> Result<SheetLayout> {
        let layout = SheetLayout::default();
        let headers = serde_json::to_string(&layout.headers)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sheet_layout (id, headers, frozen_rows, filter) VALUES (1, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                headers = excluded.headers,
                frozen_rows = excluded.frozen_rows,
                filter = excluded.filter",
            params![headers, layout.frozen_rows, layout.filter],
        )?;
        Ok(layout)
    }

    fn layout(&self) -> Result<Option<SheetLayout>> {
        let conn = self.conn.lock().unwrap();
        let row: Option<(String, u32, bool)> = conn
            .query_row(
                "SELECT headers, frozen_rows, filter FROM sheet_layout WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((headers, frozen_rows, filter)) = row else {
            return Ok(None);
        };

        Ok(Some(SheetLayout {
            headers: serde_json::from_str(&headers).context("Corrupt sheet header row")?,
            frozen_rows,
            filter,
        }))
    }

    fn commit_batch(&self, records: &[NormalizedRecord], placement: Placement) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // Compress outside the lock
        let bodies = records
            .iter()
            .map(|r| {
                Ok((
                    compress(&r.snippet, "snippet")?,
                    compress(&r.plain_text, "plain_text")?,
                    compress(&r.html_body, "html_body")?,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let (min_pos, max_pos): (Option<i64>, Option<i64>) = tx.query_row(
            "SELECT MIN(position), MAX(position) FROM records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let first = match placement {
            Placement::Top => min_pos.unwrap_or(0) - records.len() as i64,
            Placement::Bottom => max_pos.map_or(0, |p| p + 1),
        };

        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO records (position, {}) VALUES ({})",
                RECORD_COLUMNS,
                vec!["?"; 20].join(", ")
            ))?;
            let mut register =
                tx.prepare("INSERT OR IGNORE INTO dedup_index (message_id) VALUES (?)")?;

            for (offset, (record, (snippet, plain, html))) in records.iter().zip(&bodies).enumerate() {
                insert.execute(params![
                    first + offset as i64,
                    record.message_id.as_str(),
                    record.thread_id.as_str(),
                    record.timestamp_millis(),
                    record.from_name,
                    record.from_email,
                    record.to,
                    record.cc,
                    record.bcc,
                    record.subject,
                    snippet,
                    record.links,
                    record.direction.as_str(),
                    record.folder.as_str(),
                    record.read_state.as_str(),
                    record.labels,
                    plain,
                    html,
                    record.links_full,
                    record.attachments,
                ])?;
                register.execute([record.message_id.as_str()])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn indexed_ids(&self) -> Result<HashSet<MessageId>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT message_id FROM dedup_index")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|id| id.map(MessageId::from))
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    fn rows(&self) -> Result<Vec<NormalizedRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM records ORDER BY position ASC",
            RECORD_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read records")?;
        Ok(rows)
    }

    fn row_count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn clear_rows(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM records", [])?;
        Ok(())
    }

    fn clear_index(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM dedup_index", [])?;
        Ok(())
    }

    fn sort_rows(&self, order: SortOrder) -> Result<()> {
        let direction = match order {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        };

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let ids: Vec<i64> = {
            let mut stmt = tx.prepare(&format!(
                "SELECT id FROM records ORDER BY ts {}, position ASC",
                direction
            ))?;
            let ids = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<_>>()?;
            ids
        };

        {
            let mut update = tx.prepare("UPDATE records SET position = ? WHERE id = ?")?;
            for (position, id) in ids.iter().enumerate() {
                update.execute(params![position as i64, id])?;
            }
        }

        tx.commit()?;
        Ok(())
    }
}

impl CheckpointStore for SqliteSheetStore {
    fn load_checkpoint(&self) -> Result<SyncCheckpoint> {
        let conn = self.conn.lock().unwrap();
        let last_seen_ts = Self::get_property(&conn, KEY_LAST_SEEN_TS)?
            .map(|v| v.parse::<i64>())
            .transpose()
            .context("Corrupt last_seen_ts cursor")?
            .unwrap_or(0);

        Ok(SyncCheckpoint {
            fullscan_page_token: Self::get_property(&conn, KEY_PAGE_TOKEN)?,
            history_id: Self::get_property(&conn, KEY_HISTORY_ID)?,
            last_seen_ts,
        })
    }

    fn save_checkpoint(&self, checkpoint: &SyncCheckpoint) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        Self::set_property(&tx, KEY_PAGE_TOKEN, checkpoint.fullscan_page_token.as_deref())?;
        Self::set_property(&tx, KEY_HISTORY_ID, checkpoint.history_id.as_deref())?;
        let ts = (checkpoint.last_seen_ts != 0).then(|| checkpoint.last_seen_ts.to_string());
        Self::set_property(&tx, KEY_LAST_SEEN_TS, ts.as_deref())?;
        tx.commit()?;
        Ok(())
    }

    fn run_token(&self) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        Self::get_property(&conn, KEY_RUN_TOKEN)
    }

    fn set_run_token(&self, token: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::set_property(&conn, KEY_RUN_TOKEN, Some(token))
    }
}

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{FomoError, Result};
use crate::domain::TokenRecord;
use crate::store::Store;

/// Stored form of a token's creation time.
const CREATED_AT_COLUMN_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| FomoError::Other(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| FomoError::Other(format!("Store lock poisoned: {}", e)))
    }

    fn parse_created_at(s: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(s, CREATED_AT_COLUMN_FORMAT).ok()
    }

    fn parse_fetched_at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_token(row: &Row<'_>) -> rusqlite::Result<TokenRecord> {
        Ok(TokenRecord {
            url: row.get(0)?,
            name: row.get(1)?,
            ticker: row.get(2)?,
            logo_url: row.get(3)?,
            creator_address: row.get(4)?,
            creator_name: row.get(5)?,
            creator_avatar_url: row.get(6)?,
            created_at: row
                .get::<_, Option<String>>(7)?
                .and_then(|s| Self::parse_created_at(&s)),
            created_at_raw: row.get(8)?,
            age: row.get(9)?,
            market_cap: row.get(10)?,
            supply: row.get(11)?,
            replies: row.get(12)?,
            description: row.get(13)?,
            fetched_at: Self::parse_fetched_at(&row.get::<_, String>(14)?),
        })
    }
}

const TOKEN_COLUMNS: &str = "url, name, ticker, logo_url, creator_address, creator_name, \
     creator_avatar_url, created_at, created_at_raw, age, market_cap, supply, replies, \
     description, fetched_at";

impl Store for SqliteStore {
    fn is_synced(&self, url: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sync_ledger WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn synced_urls(&self) -> Result<HashSet<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT url FROM sync_ledger")?;
        let urls = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(urls)
    }

    fn insert_token(&self, token: &TokenRecord) -> Result<bool> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        // Ledger first: an already-ledgered URL makes the whole insert a
        // no-op, which also defends against a duplicate within one round.
        let ledgered = tx.execute(
            "INSERT OR IGNORE INTO sync_ledger (url, synced_at) VALUES (?1, ?2)",
            params![token.url, Utc::now().to_rfc3339()],
        )?;
        if ledgered == 0 {
            return Ok(false);
        }

        tx.execute(
            "INSERT INTO tokens (url, name, ticker, logo_url, creator_address, creator_name, \
             creator_avatar_url, created_at, created_at_raw, age, market_cap, supply, replies, \
             description, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                token.url,
                token.name,
                token.ticker,
                token.logo_url,
                token.creator_address,
                token.creator_name,
                token.creator_avatar_url,
                token
                    .created_at
                    .map(|dt| dt.format(CREATED_AT_COLUMN_FORMAT).to_string()),
                token.created_at_raw,
                token.age,
                token.market_cap,
                token.supply,
                token.replies,
                token.description,
                token.fetched_at.to_rfc3339()
            ],
        )?;

        tx.commit()?;
        Ok(true)
    }

    fn all_tokens(&self) -> Result<Vec<TokenRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tokens ORDER BY fetched_at, url",
            TOKEN_COLUMNS
        ))?;
        let tokens = stmt
            .query_map([], Self::row_to_token)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tokens)
    }

    fn token(&self, url: &str) -> Result<Option<TokenRecord>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM tokens WHERE url = ?1", TOKEN_COLUMNS),
                params![url],
                Self::row_to_token,
            )
            .optional()?;
        Ok(result)
    }

    fn token_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM tokens", [], |row| row.get(0))?;
        Ok(count)
    }
}

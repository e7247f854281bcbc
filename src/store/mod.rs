pub mod sqlite;

use std::collections::HashSet;

use crate::app::Result;
use crate::domain::TokenRecord;

pub use sqlite::SqliteStore;

/// Durable sync state: the token records plus the ledger of identifiers
/// that have completed synchronization.
pub trait Store {
    /// Whether this URL has already been synchronized.
    fn is_synced(&self, url: &str) -> Result<bool>;

    /// All ledgered URLs, for computing a round's new-candidate set.
    fn synced_urls(&self) -> Result<HashSet<String>>;

    /// Insert a token and its ledger entry as one transaction.
    ///
    /// Returns `false` without writing anything if the URL is already
    /// ledgered; duplicate discovery is a no-op, not an error.
    fn insert_token(&self, token: &TokenRecord) -> Result<bool>;

    /// Full scan, used by the aggregation layer.
    fn all_tokens(&self) -> Result<Vec<TokenRecord>>;

    fn token(&self, url: &str) -> Result<Option<TokenRecord>>;

    fn token_count(&self) -> Result<i64>;
}

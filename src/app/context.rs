use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{FomoError, Result};
use crate::config::Config;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match config.db_path {
            Some(ref p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Ok(Self { config, store })
    }

    pub fn in_memory() -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Ok(Self {
            config: Config::default(),
            store,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| FomoError::Config("Could not find data directory".into()))?;
        let fomoscan_dir = data_dir.join("fomoscan");
        std::fs::create_dir_all(&fomoscan_dir)?;
        Ok(fomoscan_dir.join("fomoscan.db"))
    }
}

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::{MediaDraft, MediaPatch, MediaRecord, MediaType};
use redb::{
    CommitError, Database, DatabaseError, ReadableTable, TableDefinition, TableError,
    TransactionError,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const MEDIA_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("media");
const META_TABLE: TableDefinition<&str, u64> = TableDefinition::new("meta");

const META_NEXT_ID_KEY: &str = "next_id";

/// Persistence for media records. Every mutation is its own transaction.
pub trait CatalogStore: Send + Sync {
    fn create(&self, draft: MediaDraft) -> Result<MediaRecord, CatalogError>;
    fn get(&self, id: u64) -> Result<Option<MediaRecord>, CatalogError>;
    fn query(&self, filter: &MediaFilter, order: OrderBy) -> Result<Vec<MediaRecord>, CatalogError>;
    fn update(&self, id: u64, patch: MediaPatch) -> Result<Option<MediaRecord>, CatalogError>;
    fn delete(&self, id: u64) -> Result<bool, CatalogError>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum MediaFilter {
    All,
    Favorites,
    Type(MediaType),
    /// Case-insensitive substring of the title or the filename.
    Search(String),
}

impl MediaFilter {
    pub fn matches(&self, record: &MediaRecord) -> bool {
        match self {
            MediaFilter::All => true,
            MediaFilter::Favorites => record.is_favorite,
            MediaFilter::Type(media_type) => record.media_type == *media_type,
            MediaFilter::Search(query) => {
                let query = query.to_lowercase();
                let title_hit = record
                    .title
                    .as_deref()
                    .map(|title| title.to_lowercase().contains(&query))
                    .unwrap_or(false);
                title_hit || record.filename.to_lowercase().contains(&query)
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderBy {
    /// Untitled records first, then by title; ties keep insertion order.
    #[default]
    Title,
    Newest,
}

impl OrderBy {
    fn sort(self, items: &mut [MediaRecord]) {
        match self {
            OrderBy::Title => {
                items.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)))
            }
            OrderBy::Newest => items.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            }),
        }
    }
}

#[derive(Clone)]
pub struct RedbCatalog {
    db: Arc<Database>,
}

impl RedbCatalog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let catalog = Self::new(Arc::new(open_or_create_db(path)?));
        catalog.init_tables()?;
        Ok(catalog)
    }

    pub fn init_tables(&self) -> Result<(), CatalogError> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(MEDIA_TABLE)?;
            let _ = write_txn.open_table(META_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

impl CatalogStore for RedbCatalog {
    fn create(&self, draft: MediaDraft) -> Result<MediaRecord, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let record = {
            let mut meta = write_txn.open_table(META_TABLE)?;
            let id = meta.get(META_NEXT_ID_KEY)?.map(|v| v.value()).unwrap_or(1);
            meta.insert(META_NEXT_ID_KEY, id + 1)?;

            let record = draft.into_record(id, OffsetDateTime::now_utc());
            let mut table = write_txn.open_table(MEDIA_TABLE)?;
            let bytes = encode_value(&record)?;
            table.insert(id, bytes.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(record)
    }

    fn get(&self, id: u64) -> Result<Option<MediaRecord>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(MEDIA_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let record = match table.get(id)? {
            Some(value) => Some(decode_value(value.value())?),
            None => None,
        };
        Ok(record)
    }

    fn query(&self, filter: &MediaFilter, order: OrderBy) -> Result<Vec<MediaRecord>, CatalogError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(MEDIA_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut items = Vec::new();
        for entry in table.iter()? {
            let entry = entry?;
            let record: MediaRecord = decode_value(entry.1.value())?;
            if filter.matches(&record) {
                items.push(record);
            }
        }
        order.sort(&mut items);
        Ok(items)
    }

    fn update(&self, id: u64, patch: MediaPatch) -> Result<Option<MediaRecord>, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let updated = {
            let mut table = write_txn.open_table(MEDIA_TABLE)?;
            let mut record: MediaRecord = match table.get(id)? {
                Some(value) => decode_value(value.value())?,
                None => return Ok(None),
            };
            patch.apply(&mut record, OffsetDateTime::now_utc());
            let bytes = encode_value(&record)?;
            table.insert(id, bytes.as_slice())?;
            record
        };
        write_txn.commit()?;
        Ok(Some(updated))
    }

    fn delete(&self, id: u64) -> Result<bool, CatalogError> {
        let write_txn = self.db.begin_write()?;
        let deleted = {
            let mut table = write_txn.open_table(MEDIA_TABLE)?;
            let removed = table.remove(id)?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(deleted)
    }
}

fn open_or_create_db(path: &Path) -> Result<Database, CatalogError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        Ok(Database::open(path)?)
    } else {
        Ok(Database::create(path)?)
    }
}

#[derive(Debug)]
pub enum CatalogError {
    Io(std::io::Error),
    Redb(redb::Error),
    Bincode(Box<bincode::ErrorKind>),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Io(err) => write!(f, "io error: {}", err),
            CatalogError::Redb(err) => write!(f, "db error: {}", err),
            CatalogError::Bincode(err) => write!(f, "bincode error: {}", err),
        }
    }
}

impl std::error::Error for CatalogError {}

impl From<std::io::Error> for CatalogError {
    fn from(err: std::io::Error) -> Self {
        CatalogError::Io(err)
    }
}

impl From<redb::Error> for CatalogError {
    fn from(err: redb::Error) -> Self {
        CatalogError::Redb(err)
    }
}

impl From<DatabaseError> for CatalogError {
    fn from(err: DatabaseError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<TableError> for CatalogError {
    fn from(err: TableError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<TransactionError> for CatalogError {
    fn from(err: TransactionError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<redb::StorageError> for CatalogError {
    fn from(err: redb::StorageError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<CommitError> for CatalogError {
    fn from(err: CommitError) -> Self {
        CatalogError::Redb(err.into())
    }
}

impl From<Box<bincode::ErrorKind>> for CatalogError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        CatalogError::Bincode(err)
    }
}

fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, CatalogError> {
    Ok(bincode::serialize(value)?)
}

fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, CatalogError> {
    Ok(bincode::deserialize(bytes)?)
}

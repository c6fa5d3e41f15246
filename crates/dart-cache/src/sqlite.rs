//! SQLite-backed record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dart_core::{
    Clock, CorpCode, DataError, Entity, FinancialRecord, Period, Quarter, RecordStore, Result,
    Statement, StatementKind, SystemClock,
};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};

fn store_err(e: impl std::fmt::Display) -> DataError {
    DataError::StoreUnavailable(e.to_string())
}

/// Quarter column value; annual rows use 0 so the key column is never NULL
/// and annual sorts before Q1.
fn quarter_to_db(period: Period) -> u8 {
    period.quarter.map_or(0, Quarter::number)
}

fn period_from_db(fiscal_year: i32, quarter: u8) -> Result<Period> {
    match quarter {
        0 => Ok(Period::annual(fiscal_year)),
        n => Quarter::from_number(n)
            .map(|q| Period::quarterly(fiscal_year, q))
            .ok_or_else(|| DataError::Parse(format!("Invalid stored quarter: {n}"))),
    }
}

/// SQLite store for normalized statements.
///
/// Every statement kind shares one table keyed by
/// `(kind, corp_code, fiscal_year, quarter)`; the statement body is stored as
/// JSON. All access goes through one connection behind a mutex, so an upsert
/// is a single atomic statement with respect to concurrent readers.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
}

impl SqliteStore {
    /// Opens (or creates) a store at `path` and ensures the schema.
    ///
    /// # Errors
    /// Returns [`DataError::StoreUnavailable`] if the database cannot be
    /// opened or the schema cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(store_err)?;
        Self::from_connection(conn)
    }

    /// Opens a private in-memory store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            clock: Arc::new(SystemClock),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Replaces the clock used to stamp `last_refreshed`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(store_err)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS entities (
                corp_code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                stock_code TEXT,
                sector TEXT
            )",
            [],
        )
        .map_err(store_err)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS financial_records (
                kind TEXT NOT NULL,
                corp_code TEXT NOT NULL,
                fiscal_year INTEGER NOT NULL,
                quarter INTEGER NOT NULL DEFAULT 0,
                data_json TEXT NOT NULL,
                last_refreshed TEXT NOT NULL,
                PRIMARY KEY (kind, corp_code, fiscal_year, quarter)
            )",
            [],
        )
        .map_err(store_err)?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_financial_records_corp
             ON financial_records(corp_code, kind)",
            [],
        )
        .map_err(store_err)?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    fn decode_record(
        corp_code: &CorpCode,
        kind: StatementKind,
        fiscal_year: i32,
        quarter: u8,
        data_json: &str,
        last_refreshed: &str,
    ) -> Result<FinancialRecord> {
        let statement: Statement =
            serde_json::from_str(data_json).map_err(|e| DataError::Parse(e.to_string()))?;
        if statement.kind() != kind {
            return Err(DataError::Parse(format!(
                "Stored {} record under {kind} key",
                statement.kind()
            )));
        }
        let last_refreshed = DateTime::parse_from_rfc3339(last_refreshed)
            .map_err(|e| DataError::Parse(e.to_string()))?
            .with_timezone(&Utc);

        Ok(FinancialRecord {
            corp_code: corp_code.clone(),
            period: period_from_db(fiscal_year, quarter)?,
            statement,
            last_refreshed,
        })
    }
}

type RecordRow = (i32, u8, String, String);

#[async_trait]
impl RecordStore for SqliteStore {
    async fn ensure_schema(&self) -> Result<()> {
        self.initialize_schema()
    }

    #[instrument(skip(self, entities), fields(count = entities.len()))]
    async fn seed_entities(&self, entities: &[Entity]) -> Result<()> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction().map_err(store_err)?;

        for entity in entities {
            tx.execute(
                "INSERT INTO entities (corp_code, name, stock_code, sector)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (corp_code) DO UPDATE SET
                    name = excluded.name,
                    stock_code = excluded.stock_code,
                    sector = excluded.sector",
                params![
                    entity.corp_code.as_str(),
                    entity.name,
                    entity.stock_code,
                    entity.sector
                ],
            )
            .map_err(store_err)?;
        }

        tx.commit().map_err(store_err)?;
        debug!("Seeded {} entities", entities.len());
        Ok(())
    }

    #[instrument(skip(self), fields(corp_code = %corp_code))]
    async fn entity(&self, corp_code: &CorpCode) -> Result<Option<Entity>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT name, stock_code, sector FROM entities WHERE corp_code = ?1",
                params![corp_code.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(store_err)?;

        Ok(row.map(|(name, stock_code, sector)| Entity {
            corp_code: corp_code.clone(),
            name,
            stock_code,
            sector,
        }))
    }

    #[instrument(skip(self), fields(kind = %kind, corp_code = %corp_code, period = %period))]
    async fn get(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
        period: Period,
    ) -> Result<Option<FinancialRecord>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT data_json, last_refreshed FROM financial_records
                 WHERE kind = ?1 AND corp_code = ?2 AND fiscal_year = ?3 AND quarter = ?4",
                params![
                    kind.as_str(),
                    corp_code.as_str(),
                    period.fiscal_year,
                    quarter_to_db(period)
                ],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(store_err)?;

        match row {
            Some((data_json, last_refreshed)) => {
                debug!("Found stored record");
                Self::decode_record(
                    corp_code,
                    kind,
                    period.fiscal_year,
                    quarter_to_db(period),
                    &data_json,
                    &last_refreshed,
                )
                .map(Some)
            }
            None => {
                debug!("No stored record");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self), fields(kind = %kind, corp_code = %corp_code))]
    async fn get_all(
        &self,
        kind: StatementKind,
        corp_code: &CorpCode,
    ) -> Result<Vec<FinancialRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT fiscal_year, quarter, data_json, last_refreshed FROM financial_records
                 WHERE kind = ?1 AND corp_code = ?2
                 ORDER BY fiscal_year ASC, quarter ASC",
            )
            .map_err(store_err)?;

        let rows = stmt
            .query_map(params![kind.as_str(), corp_code.as_str()], |row| {
                Ok((
                    row.get::<_, i32>(0)?,
                    row.get::<_, u8>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(store_err)?;

        let mut records = Vec::new();
        for row in rows {
            let (fiscal_year, quarter, data_json, last_refreshed): RecordRow =
                row.map_err(store_err)?;
            records.push(Self::decode_record(
                corp_code,
                kind,
                fiscal_year,
                quarter,
                &data_json,
                &last_refreshed,
            )?);
        }

        debug!("Found {} stored records", records.len());
        Ok(records)
    }

    #[instrument(skip(self, statement), fields(kind = %statement.kind(), corp_code = %corp_code, period = %period))]
    async fn upsert(
        &self,
        corp_code: &CorpCode,
        period: Period,
        statement: Statement,
    ) -> Result<FinancialRecord> {
        let data_json =
            serde_json::to_string(&statement).map_err(|e| DataError::Parse(e.to_string()))?;
        let last_refreshed = self.clock.now();

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO financial_records
             (kind, corp_code, fiscal_year, quarter, data_json, last_refreshed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (kind, corp_code, fiscal_year, quarter) DO UPDATE SET
                data_json = excluded.data_json,
                last_refreshed = excluded.last_refreshed",
            params![
                statement.kind().as_str(),
                corp_code.as_str(),
                period.fiscal_year,
                quarter_to_db(period),
                data_json,
                last_refreshed.to_rfc3339()
            ],
        )
        .map_err(store_err)?;

        debug!("Upserted record");
        Ok(FinancialRecord {
            corp_code: corp_code.clone(),
            period,
            statement,
            last_refreshed,
        })
    }
}

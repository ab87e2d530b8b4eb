use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use time::macros::format_description;
use time::{Date, Duration, OffsetDateTime};

use crate::config::{ConfigPaths, StorageOptions};
use crate::model::{ItemReport, ReportDraft, ReportId, ReportKind, ReportStatus};

mod memory;
mod schema;

pub use memory::MemoryStore;

const REPORT_COLUMNS: &str = "id, name, description, category, location, kind, status, \
                              reward_amount, image_ref, contact, occurred_on, created_at";

/// Result of a status write guarded on the caller's last-known status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    Conflict { actual: ReportStatus },
    NotFound,
}

/// The persistence collaborator behind the catalog.
#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Every active report, newest first.
    async fn query_active(&self) -> Result<Vec<ItemReport>>;

    /// Sets `next` only if the stored status still equals `expected`.
    async fn update_status_if(
        &self,
        id: &ReportId,
        expected: ReportStatus,
        next: ReportStatus,
    ) -> Result<WriteOutcome>;

    /// Persists a validated draft as a new active report.
    async fn insert(&self, draft: ReportDraft) -> Result<ItemReport>;

    async fn fetch_by_id(&self, id: &ReportId) -> Result<Option<ItemReport>>;
}

#[derive(Clone)]
pub struct SqliteStore {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl SqliteStore {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn fetch_active_reports(&self) -> Result<Vec<ItemReport>> {
        self.with_connection(|conn| {
            let sql = format!(
                "SELECT {REPORT_COLUMNS}
                 FROM reports
                 WHERE status = ?1
                 ORDER BY created_at DESC, rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let reports = stmt
                .query_map([ReportStatus::Active.as_ref()], report_from_row)?
                .collect::<Result<Vec<_>, _>>()
                .context("querying active reports")?;
            Ok(reports)
        })
    }

    pub fn fetch_report(&self, id: &ReportId) -> Result<Option<ItemReport>> {
        self.with_connection(|conn| {
            let sql = format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1");
            let report = conn
                .query_row(&sql, params![id.as_str()], report_from_row)
                .optional()
                .with_context(|| format!("fetching report {id}"))?;
            Ok(report)
        })
    }

    pub fn set_status_if(
        &self,
        id: &ReportId,
        expected: ReportStatus,
        next: ReportStatus,
    ) -> Result<WriteOutcome> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("starting status update")?;
        let updated = tx
            .execute(
                "UPDATE reports SET status = ?1 WHERE id = ?2 AND status = ?3",
                params![next.as_ref(), id.as_str(), expected.as_ref()],
            )
            .with_context(|| format!("updating status of report {id}"))?;
        let outcome = if updated == 1 {
            WriteOutcome::Applied
        } else {
            let actual: Option<String> = tx
                .query_row(
                    "SELECT status FROM reports WHERE id = ?1",
                    params![id.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            match actual {
                Some(raw) => WriteOutcome::Conflict {
                    actual: raw
                        .parse()
                        .with_context(|| format!("unknown stored status {raw:?}"))?,
                },
                None => WriteOutcome::NotFound,
            }
        };
        tx.commit().context("committing status update")?;
        Ok(outcome)
    }

    pub fn insert_report(&self, draft: ReportDraft) -> Result<ItemReport> {
        let report = draft.into_report(ReportId::generate(), now_millis())?;
        self.with_connection(|conn| {
            insert_row(conn, &report).context("inserting report")?;
            Ok(())
        })?;
        Ok(report)
    }

    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&SqliteStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .context("storage task panicked")?
    }
}

#[async_trait]
impl ReportStore for SqliteStore {
    async fn query_active(&self) -> Result<Vec<ItemReport>> {
        self.blocking(|store| store.fetch_active_reports()).await
    }

    async fn update_status_if(
        &self,
        id: &ReportId,
        expected: ReportStatus,
        next: ReportStatus,
    ) -> Result<WriteOutcome> {
        let id = id.clone();
        self.blocking(move |store| store.set_status_if(&id, expected, next))
            .await
    }

    async fn insert(&self, draft: ReportDraft) -> Result<ItemReport> {
        self.blocking(move |store| store.insert_report(draft)).await
    }

    async fn fetch_by_id(&self, id: &ReportId) -> Result<Option<ItemReport>> {
        let id = id.clone();
        self.blocking(move |store| store.fetch_report(&id)).await
    }
}

/// Opens (creating if needed) the database named by `storage.database_path`,
/// falling back to the discovered default location.
pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<SqliteStore> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    if !existed && storage.seed_demo_reports {
        seed_demo_reports(&conn)?;
    }
    Ok(SqliteStore {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.busy_timeout(storage.busy_timeout())
        .context("setting busy timeout")?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |_row| Ok(()))
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

fn insert_row(conn: &Connection, report: &ItemReport) -> Result<()> {
    let occurred_on = report
        .occurred_on
        .map(|date| date.format(format_description!("[year]-[month]-[day]")))
        .transpose()
        .context("formatting occurrence date")?;
    conn.execute(
        "INSERT INTO reports (id, name, description, category, location, kind, status,
                              reward_amount, image_ref, contact, occurred_on, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            report.id.as_str(),
            report.name,
            report.description,
            report.category,
            report.location,
            report.kind.as_ref(),
            report.status.as_ref(),
            report.reward_amount,
            report.image_ref,
            report.contact,
            occurred_on,
            to_millis(report.created_at),
        ],
    )?;
    Ok(())
}

fn report_from_row(row: &Row<'_>) -> rusqlite::Result<ItemReport> {
    let occurred_on = row
        .get::<_, Option<String>>(10)?
        .map(|raw| Date::parse(&raw, format_description!("[year]-[month]-[day]")))
        .transpose()
        .map_err(|err| conversion_error(10, err))?;
    let created_at =
        from_millis(row.get::<_, i64>(11)?).map_err(|err| conversion_error(11, err))?;
    Ok(ItemReport {
        id: ReportId::from(row.get::<_, String>(0)?),
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        location: row.get(4)?,
        kind: parse_column(row, 5)?,
        status: parse_column(row, 6)?,
        reward_amount: row.get(7)?,
        image_ref: row.get(8)?,
        contact: row.get(9)?,
        occurred_on,
        created_at,
    })
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>().map_err(|err| conversion_error(idx, err))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

// Stored at millisecond precision so a report reads back equal to what insert returned.
fn now_millis() -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    from_millis(to_millis(now)).unwrap_or(now)
}

fn to_millis(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_millis(millis: i64) -> Result<OffsetDateTime, time::error::ComponentRange> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
}

fn seed_demo_reports(conn: &Connection) -> Result<()> {
    let existing: Option<String> = conn
        .query_row("SELECT id FROM reports LIMIT 1", [], |row| row.get(0))
        .optional()
        .context("checking for existing reports")?;
    if existing.is_some() {
        return Ok(());
    }

    tracing::info!("seeding demo reports");
    let now = now_millis();
    let demo = [
        (
            ReportKind::Lost,
            ReportStatus::Active,
            "iPhone 13 Pro",
            "iPhone color azul con funda negra. Última vez visto en la biblioteca",
            "electronics",
            "biblioteca",
            2,
        ),
        (
            ReportKind::Found,
            ReportStatus::Active,
            "Mochila Deportiva Nike",
            "Mochila negra con el logo de Nike, contiene cuadernos y calculadora",
            "accessories",
            "canchas",
            5,
        ),
        (
            ReportKind::Found,
            ReportStatus::Active,
            "Calculadora Casio FX-991",
            "Calculadora científica con nombre escrito en la parte posterior",
            "supplies",
            "ing",
            24,
        ),
        (
            ReportKind::Lost,
            ReportStatus::Active,
            "Llaves con llavero de Pokemon",
            "Juego de 3 llaves con llavero de Pikachu",
            "documents",
            "comedor",
            3,
        ),
        (
            ReportKind::Lost,
            ReportStatus::Returned,
            "Audífonos Sony WH-1000XM4",
            "Audífonos inalámbricos color negro con estuche",
            "electronics",
            "lab",
            6,
        ),
        (
            ReportKind::Found,
            ReportStatus::Active,
            "Cartera de Cuero",
            "Cartera marrón de cuero con documentos de identificación",
            "documents",
            "admin",
            4,
        ),
    ];

    for (kind, status, name, description, category, location, hours_ago) in demo {
        let mut report = ReportDraft::new(kind, name, category, location)
            .with_description(description)
            .into_report(ReportId::generate(), now - Duration::hours(hours_ago))?;
        report.status = status;
        insert_row(conn, &report).context("inserting seed report")?;
    }

    Ok(())
}

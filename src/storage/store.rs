use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tracing::info;

use crate::error::Result;
use crate::models::{RunMetrics, RunStatus};

/// One fact row joined with its dimension, as read back for reporting.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub dimension_key: String,
    pub attributes: Map<String, Value>,
    pub fields: Map<String, Value>,
    pub extracted_at: DateTime<Utc>,
}

/// Durable tabular store: a dimension table keyed by natural key, an
/// append-only fact table, and one metrics row per cycle. Table and column
/// names stay compatible with the schema the existing dashboards read.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        info!(path = %path.display(), "Store opened");
        Ok(store)
    }

    /// Private in-memory store, one connection so every query sees the
    /// same database. Test-only in practice.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dimensiones (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                clave TEXT NOT NULL UNIQUE,
                atributos TEXT NOT NULL DEFAULT '{}'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS registros (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                dimension_id INTEGER NOT NULL REFERENCES dimensiones(id),
                campos TEXT NOT NULL,
                fecha_extraccion TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_registros_dimension
            ON registros(dimension_id, fecha_extraccion DESC)
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS metricas_etl (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fecha_ejecucion TEXT NOT NULL,
                estado TEXT NOT NULL,
                registros_extraidos INTEGER NOT NULL,
                registros_guardados INTEGER NOT NULL,
                registros_fallidos INTEGER NOT NULL,
                tiempo_ejecucion_segundos REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns the existing id for a natural key or inserts a new row.
    /// Atomic under the unique constraint, so repeated calls across cycles
    /// (or a concurrent caller) never create duplicates. Attributes are
    /// written on first sight only: first write wins.
    pub async fn upsert_dimension(
        &self,
        natural_key: &str,
        attrs: &Map<String, Value>,
    ) -> Result<i64> {
        sqlx::query("INSERT INTO dimensiones (clave, atributos) VALUES (?1, ?2) ON CONFLICT(clave) DO NOTHING")
            .bind(natural_key)
            .bind(serde_json::to_string(attrs)?)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query("SELECT id FROM dimensiones WHERE clave = ?1")
            .bind(natural_key)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get::<i64, _>("id"))
    }

    /// Always inserts. Fact rows are immutable once written.
    pub async fn append_fact(
        &self,
        dimension_id: i64,
        fields: &Map<String, Value>,
        extracted_at: DateTime<Utc>,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO registros (dimension_id, campos, fecha_extraccion) VALUES (?1, ?2, ?3)",
        )
        .bind(dimension_id)
        .bind(serde_json::to_string(fields)?)
        .bind(format_ts(extracted_at))
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Always inserts, one row per cycle.
    pub async fn record_run(&self, metrics: &RunMetrics) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO metricas_etl
                (fecha_ejecucion, estado, registros_extraidos,
                 registros_guardados, registros_fallidos, tiempo_ejecucion_segundos)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(format_ts(metrics.started_at))
        .bind(metrics.status.as_str())
        .bind(metrics.extracted)
        .bind(metrics.saved)
        .bind(metrics.failed)
        .bind(metrics.duration_seconds)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent fact per dimension, optionally narrowed to one natural
    /// key. Read by downstream reporting, not by the pipeline itself.
    pub async fn query_latest(&self, dimension_key: Option<&str>) -> Result<Vec<StoredRecord>> {
        let sql = r#"
            SELECT d.clave, d.atributos, r.campos, r.fecha_extraccion
            FROM registros r
            JOIN dimensiones d ON d.id = r.dimension_id
            WHERE r.id = (
                SELECT r2.id FROM registros r2
                WHERE r2.dimension_id = r.dimension_id
                ORDER BY r2.fecha_extraccion DESC, r2.id DESC
                LIMIT 1
            )
            AND (?1 IS NULL OR d.clave = ?1)
            ORDER BY d.clave
        "#;

        let rows = sqlx::query(sql)
            .bind(dimension_key)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// Fact rows whose extraction timestamp falls in `[from, to]`.
    pub async fn facts_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<StoredRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT d.clave, d.atributos, r.campos, r.fecha_extraccion
            FROM registros r
            JOIN dimensiones d ON d.id = r.dimension_id
            WHERE r.fecha_extraccion >= ?1 AND r.fecha_extraccion <= ?2
            ORDER BY r.fecha_extraccion, r.id
            "#,
        )
        .bind(format_ts(from))
        .bind(format_ts(to))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_record).collect()
    }

    /// Run history, newest first.
    pub async fn metrics_history(&self, limit: i64, offset: i64) -> Result<Vec<RunMetrics>> {
        let rows = sqlx::query(
            r#"
            SELECT fecha_ejecucion, estado, registros_extraidos,
                   registros_guardados, registros_fallidos, tiempo_ejecucion_segundos
            FROM metricas_etl
            ORDER BY id DESC
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let estado: String = row.get("estado");
                let status = RunStatus::parse(&estado).ok_or_else(|| {
                    sqlx::Error::Decode(format!("unknown run status: {estado}").into())
                })?;
                Ok(RunMetrics {
                    started_at: parse_ts(&row.get::<String, _>("fecha_ejecucion"))?,
                    status,
                    extracted: row.get("registros_extraidos"),
                    saved: row.get("registros_guardados"),
                    failed: row.get("registros_fallidos"),
                    duration_seconds: row.get("tiempo_ejecucion_segundos"),
                })
            })
            .collect()
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_record(row: &sqlx::sqlite::SqliteRow) -> Result<StoredRecord> {
    let attributes: Map<String, Value> = serde_json::from_str(&row.get::<String, _>("atributos"))?;
    let fields: Map<String, Value> = serde_json::from_str(&row.get::<String, _>("campos"))?;

    Ok(StoredRecord {
        dimension_key: row.get("clave"),
        attributes,
        fields,
        extracted_at: parse_ts(&row.get::<String, _>("fecha_extraccion"))?,
    })
}

// Fixed-width RFC 3339 so the TEXT column sorts chronologically.
fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| sqlx::Error::Decode(format!("bad timestamp {raw}: {e}").into()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn attrs(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn upsert_dimension_is_idempotent() {
        let store = Store::connect_in_memory().await.unwrap();

        let first = store
            .upsert_dimension("Madrid", &attrs(&[("pais", json!("Spain"))]))
            .await
            .unwrap();
        let second = store
            .upsert_dimension("Madrid", &attrs(&[("pais", json!("España"))]))
            .await
            .unwrap();

        assert_eq!(first, second);

        let latest = store.query_latest(None).await.unwrap();
        assert!(latest.is_empty());

        // First write wins for attributes.
        store.append_fact(first, &Map::new(), ts(1)).await.unwrap();
        let latest = store.query_latest(Some("Madrid")).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].attributes["pais"], json!("Spain"));
    }

    #[tokio::test]
    async fn query_latest_returns_newest_fact_per_dimension() {
        let store = Store::connect_in_memory().await.unwrap();
        let madrid = store.upsert_dimension("Madrid", &Map::new()).await.unwrap();
        let lima = store.upsert_dimension("Lima", &Map::new()).await.unwrap();

        store
            .append_fact(madrid, &attrs(&[("temperatura", json!(20))]), ts(1))
            .await
            .unwrap();
        store
            .append_fact(madrid, &attrs(&[("temperatura", json!(24))]), ts(3))
            .await
            .unwrap();
        store
            .append_fact(lima, &attrs(&[("temperatura", json!(17))]), ts(2))
            .await
            .unwrap();

        let latest = store.query_latest(None).await.unwrap();
        assert_eq!(latest.len(), 2);

        let madrid_row = latest.iter().find(|r| r.dimension_key == "Madrid").unwrap();
        assert_eq!(madrid_row.fields["temperatura"], json!(24));

        let only_lima = store.query_latest(Some("Lima")).await.unwrap();
        assert_eq!(only_lima.len(), 1);
        assert_eq!(only_lima[0].fields["temperatura"], json!(17));
    }

    #[tokio::test]
    async fn facts_between_is_inclusive() {
        let store = Store::connect_in_memory().await.unwrap();
        let dim = store.upsert_dimension("Portal 2", &Map::new()).await.unwrap();

        for hour in [1, 2, 3, 4] {
            store
                .append_fact(dim, &attrs(&[("hora", json!(hour))]), ts(hour))
                .await
                .unwrap();
        }

        let range = store.facts_between(ts(2), ts(3)).await.unwrap();
        assert_eq!(range.len(), 2);
        assert_eq!(range[0].fields["hora"], json!(2));
        assert_eq!(range[1].fields["hora"], json!(3));
    }

    #[tokio::test]
    async fn metrics_history_pages_newest_first() {
        let store = Store::connect_in_memory().await.unwrap();

        for i in 0..3 {
            let metrics = RunMetrics {
                started_at: ts(i),
                status: RunStatus::Success,
                extracted: i as i64,
                saved: i as i64,
                failed: 0,
                duration_seconds: 1.5,
            };
            store.record_run(&metrics).await.unwrap();
        }

        let page = store.metrics_history(2, 0).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].extracted, 2);
        assert_eq!(page[1].extracted, 1);

        let rest = store.metrics_history(2, 2).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].extracted, 0);
    }

    #[tokio::test]
    async fn connect_creates_the_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("etl.db");

        let store = Store::connect(&path).await.unwrap();
        let id = store.upsert_dimension("Lima", &Map::new()).await.unwrap();
        assert_eq!(id, 1);
        store.close().await;

        assert!(path.exists());
    }
}

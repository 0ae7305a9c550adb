use anyhow::Context;
use sqlx::{AnyConnection, Connection, Row};

use crate::config::DatabaseSettings;
use crate::models::{FeatureRecord, Label, PersistedRow};
use crate::page::Page;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS student_performance (
        Attendance DOUBLE NOT NULL,
        Assignment_Score DOUBLE NOT NULL,
        Midterm_Score DOUBLE NOT NULL,
        Final_Score BIGINT NOT NULL,
        Outstanding_Balance BIGINT NOT NULL,
        Library_Visits BIGINT NOT NULL,
        Performance VARCHAR(10) NOT NULL
    )
"#;

const INSERT_ROW: &str = r#"
    INSERT INTO student_performance
    (Attendance, Assignment_Score, Midterm_Score,
     Final_Score, Outstanding_Balance, Library_Visits,
     Performance)
    VALUES (?, ?, ?, ?, ?, ?, ?)
"#;

const SELECT_ROWS: &str = "SELECT Attendance, Assignment_Score, Midterm_Score, Final_Score, \
     Outstanding_Balance, Library_Visits, Performance \
     FROM student_performance";

async fn connect(settings: &DatabaseSettings) -> anyhow::Result<AnyConnection> {
    sqlx::any::install_default_drivers();
    AnyConnection::connect(&settings.url)
        .await
        .with_context(|| format!("failed to connect to {}", settings.redacted_url()))
}

// Dropping the connection would also release it; closing explicitly lets
// the server see a clean disconnect.
async fn release(conn: AnyConnection) {
    if let Err(err) = conn.close().await {
        tracing::debug!(error = %err, "error while closing database connection");
    }
}

pub async fn init_db(settings: &DatabaseSettings) -> anyhow::Result<()> {
    let mut conn = connect(settings).await?;
    let outcome = sqlx::query(CREATE_TABLE)
        .execute(&mut conn)
        .await
        .context("failed to create student_performance");
    release(conn).await;
    outcome.map(|_| ())
}

/// Inserts one row inside its own transaction. A failed insert or commit
/// rolls back when the transaction is dropped; the connection is closed on
/// every path once it was established.
pub async fn insert_prediction(settings: &DatabaseSettings, row: &PersistedRow) -> anyhow::Result<()> {
    let mut conn = connect(settings).await?;
    let outcome = insert_row(&mut conn, row).await;
    release(conn).await;
    outcome
}

async fn insert_row(conn: &mut AnyConnection, row: &PersistedRow) -> anyhow::Result<()> {
    let mut tx = conn.begin().await?;
    sqlx::query(INSERT_ROW)
        .bind(row.attendance)
        .bind(row.assignment_score)
        .bind(row.midterm_score)
        .bind(row.final_score)
        .bind(row.outstanding_balance)
        .bind(row.library_visits)
        .bind(row.performance.as_str())
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Best-effort write used by the prediction cycle. Any database error is
/// shown on the page and reported as `false`; it never propagates.
pub async fn persist(
    settings: &DatabaseSettings,
    record: &FeatureRecord,
    label: Label,
    page: &mut Page,
) -> bool {
    let row = PersistedRow::new(record, label);
    match insert_prediction(settings, &row).await {
        Ok(()) => {
            tracing::info!(performance = %label, "prediction saved");
            true
        }
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "failed to save prediction");
            page.error(format!("Failed to save prediction: {err:#}"));
            false
        }
    }
}

pub async fn fetch_rows(
    settings: &DatabaseSettings,
    limit: Option<i64>,
) -> anyhow::Result<Vec<PersistedRow>> {
    let mut conn = connect(settings).await?;
    let outcome = select_rows(&mut conn, limit).await;
    release(conn).await;
    outcome
}

async fn select_rows(conn: &mut AnyConnection, limit: Option<i64>) -> anyhow::Result<Vec<PersistedRow>> {
    let records = match limit {
        Some(limit) => {
            // No id or timestamp column: the newest rows are the last `limit`
            // in table order.
            let total: i64 = sqlx::query("SELECT COUNT(*) AS total FROM student_performance")
                .fetch_one(&mut *conn)
                .await?
                .try_get("total")?;
            let query = format!("{SELECT_ROWS} LIMIT ? OFFSET ?");
            sqlx::query(&query)
                .bind(limit)
                .bind((total - limit).max(0))
                .fetch_all(&mut *conn)
                .await?
        }
        None => sqlx::query(SELECT_ROWS).fetch_all(&mut *conn).await?,
    };

    let mut rows = Vec::with_capacity(records.len());
    for row in records {
        rows.push(PersistedRow {
            attendance: row.try_get("Attendance")?,
            assignment_score: row.try_get("Assignment_Score")?,
            midterm_score: row.try_get("Midterm_Score")?,
            final_score: row.try_get("Final_Score")?,
            outstanding_balance: row.try_get("Outstanding_Balance")?,
            library_visits: row.try_get("Library_Visits")?,
            performance: row.try_get("Performance")?,
        });
    }

    Ok(rows)
}

pub fn export_csv(rows: &[PersistedRow], out: &std::path::Path) -> anyhow::Result<usize> {
    let mut writer = csv::Writer::from_path(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(rows.len())
}

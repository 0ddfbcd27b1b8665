use crate::domain::model::USER_COLUMNS;
use crate::domain::ports::UserSink;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::validate_identifier;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolCopyExt, PgPoolOptions};
use std::time::Duration;

impl From<sqlx::Error> for EtlError {
    fn from(e: sqlx::Error) -> Self {
        EtlError::DatabaseError {
            message: e.to_string(),
        }
    }
}

/// 以 `COPY ... FROM STDIN` 將暫存檔寫入 Postgres
pub struct PostgresSink {
    pool: PgPool,
    table: String,
}

impl PostgresSink {
    pub async fn connect(database_url: &str, table: &str) -> Result<Self> {
        validate_identifier("load.table", table)?;

        tracing::debug!("Connecting to Postgres for table {}", table);
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;

        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    pub fn create_table_sql(table: &str) -> String {
        let columns = USER_COLUMNS
            .iter()
            .map(|c| format!("    {} TEXT NOT NULL", c))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("CREATE TABLE IF NOT EXISTS {}\n(\n{}\n)", table, columns)
    }

    pub fn copy_sql(table: &str) -> String {
        format!("COPY {} FROM STDIN WITH DELIMITER AS ','", table)
    }
}

#[async_trait]
impl UserSink for PostgresSink {
    async fn ensure_table(&self) -> Result<()> {
        sqlx::query(&Self::create_table_sql(&self.table))
            .execute(&self.pool)
            .await?;
        tracing::info!("🗄️ Table {} is ready", self.table);
        Ok(())
    }

    async fn copy_rows(&self, data: &[u8]) -> Result<u64> {
        let mut copy = self.pool.copy_in_raw(&Self::copy_sql(&self.table)).await?;
        let sent = copy.send(data).await.map(|_| ());
        if let Err(e) = sent {
            // 失敗時中止 COPY，讓連線回到可用狀態
            let _ = copy.abort(e.to_string()).await;
            return Err(e.into());
        }
        let rows = copy.finish().await?;
        Ok(rows)
    }

    fn target(&self) -> &str {
        &self.table
    }
}

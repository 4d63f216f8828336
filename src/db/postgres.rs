use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;
use tracing::trace;

use crate::db::KvStore;

/// Store backed by a single Postgres table.
pub struct PostgresStore {
    client: tokio_postgres::Client,
}

impl PostgresStore {
    pub async fn connect(db_url: &str) -> Result<Self> {
        let mut client = make_client(db_url).await?;
        run_migrations(&mut client)
            .await
            .context("failed to run database migrations")?;
        Ok(PostgresStore { client })
    }
}

/// Connects to Postgres, over TLS when the URL asks for `sslmode=require`.
pub async fn make_client(db_url: &str) -> Result<tokio_postgres::Client> {
    if db_url.contains("sslmode=require") {
        let connector = TlsConnector::builder()
            .build()
            .context("failed to build TLS connector")?;
        let (client, connection) =
            tokio_postgres::connect(db_url, MakeTlsConnector::new(connector))
                .await
                .context("failed to connect to the database")?;
        drive(connection);
        Ok(client)
    } else {
        tracing::warn!("connecting to the database without TLS");
        let (client, connection) = tokio_postgres::connect(db_url, tokio_postgres::NoTls)
            .await
            .context("failed to connect to the database")?;
        drive(connection);
        Ok(client)
    }
}

/// Polls the connection half in the background until it closes.
fn drive<C>(connection: C)
where
    C: Future<Output = Result<(), tokio_postgres::Error>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            tracing::error!("database connection error: {e}");
        }
    });
}

/// Applied in order; each entry runs once per database.
static MIGRATIONS: &[&str] = &[
    "CREATE TABLE kv_store (
        key TEXT PRIMARY KEY,
        value BYTEA NOT NULL,
        expires_at TIMESTAMP WITH TIME ZONE
    );",
    "CREATE INDEX kv_store_expires_at_index ON kv_store (expires_at);",
];

pub async fn run_migrations(client: &mut tokio_postgres::Client) -> Result<()> {
    client
        .batch_execute("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")
        .await
        .context("failed to create schema_version")?;

    let tx = client.transaction().await?;
    // Instances starting together apply migrations one at a time.
    tx.batch_execute("LOCK TABLE schema_version IN EXCLUSIVE MODE;")
        .await
        .context("failed to lock schema_version")?;
    let applied: i64 = tx
        .query_one("SELECT COUNT(*) FROM schema_version", &[])
        .await
        .context("failed to read schema_version")?
        .get(0);

    for (version, migration) in MIGRATIONS.iter().enumerate().skip(applied as usize) {
        tracing::info!("applying database migration {version}");
        tx.batch_execute(migration)
            .await
            .with_context(|| format!("failed to apply migration {version}"))?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES ($1)",
            &[&(version as i32)],
        )
        .await?;
    }
    tx.commit().await.context("failed to commit migrations")?;
    Ok(())
}

#[async_trait]
impl KvStore for PostgresStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        trace!("get {key}");
        let row = self
            .client
            .query_opt(
                "SELECT value FROM kv_store
                    WHERE key = $1 AND (expires_at IS NULL OR expires_at > now())",
                &[&key],
            )
            .await
            .context("kv get")?;
        Ok(row.map(|row| row.get(0)))
    }

    async fn set(&self, key: &str, value: &[u8], expiry: Option<Duration>) -> Result<()> {
        trace!("set {key}");
        let expires_at: Option<DateTime<Utc>> = match expiry {
            Some(expiry) => Some(Utc::now() + chrono::Duration::from_std(expiry)?),
            None => None,
        };
        self.client
            .execute(
                "INSERT INTO kv_store (key, value, expires_at) VALUES ($1, $2, $3)
                    ON CONFLICT (key) DO UPDATE
                    SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at",
                &[&key, &value, &expires_at],
            )
            .await
            .context("kv set")?;
        Ok(())
    }

    async fn compare_and_set(&self, key: &str, old: Option<&[u8]>, new: &[u8]) -> Result<bool> {
        trace!("compare_and_set {key}");
        let modified = match old {
            // Only an absent or expired row may be claimed.
            None => self
                .client
                .execute(
                    "INSERT INTO kv_store (key, value) VALUES ($1, $2)
                        ON CONFLICT (key) DO UPDATE
                        SET value = EXCLUDED.value, expires_at = NULL
                        WHERE kv_store.expires_at IS NOT NULL AND kv_store.expires_at <= now()",
                    &[&key, &new],
                )
                .await
                .context("kv compare_and_set insert")?,
            Some(old) => self
                .client
                .execute(
                    "UPDATE kv_store SET value = $2, expires_at = NULL
                        WHERE key = $1 AND value = $3
                        AND (expires_at IS NULL OR expires_at > now())",
                    &[&key, &new, &old],
                )
                .await
                .context("kv compare_and_set update")?,
        };
        Ok(modified == 1)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        trace!("delete {key}");
        self.client
            .execute("DELETE FROM kv_store WHERE key = $1", &[&key])
            .await
            .context("kv delete")?;
        Ok(())
    }
}

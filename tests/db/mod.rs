//! Tests for the key/value stores and the state kept in them.
//!
//! The [`run_test`] function gives your callback a fresh store to interact
//! with. The general form of a test is:
//!
//! ```rust
//! #[test]
//! fn example() {
//!     run_test(|store| async move {
//!         // Call methods on `store` and verify its behavior.
//!     });
//! }
//! ```
//!
//! The callback always runs against the in-memory store. When `TEST_DB_URL`
//! points to a Postgres server, it also runs against a scratch database
//! created on that server for the test and dropped afterwards.

use futures::Future;
use hubrelay::db::KvStore;
use hubrelay::db::memory::MemoryStore;
use hubrelay::db::postgres::{PostgresStore, make_client};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use url::Url;

mod kv;
mod state;

static NEXT_DB: AtomicUsize = AtomicUsize::new(0);

struct PgContext {
    admin_url: String,
    db_name: String,
}

impl PgContext {
    async fn create(admin_url: &str) -> (PgContext, PostgresStore) {
        let db_name = format!(
            "hubrelay_test_{}_{}",
            std::process::id(),
            NEXT_DB.fetch_add(1, Ordering::SeqCst)
        );
        let admin = make_client(admin_url).await.unwrap();
        admin
            .execute(&format!("CREATE DATABASE {db_name}"), &[])
            .await
            .unwrap();

        let mut url = Url::parse(admin_url).unwrap();
        url.set_path(&db_name);
        let store = PostgresStore::connect(url.as_str()).await.unwrap();
        (
            PgContext {
                admin_url: admin_url.to_string(),
                db_name,
            },
            store,
        )
    }

    async fn drop_database(self) {
        let admin = make_client(&self.admin_url).await.unwrap();
        admin
            .execute(
                &format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", self.db_name),
                &[],
            )
            .await
            .unwrap();
    }
}

fn run_test<F, Fut>(f: F)
where
    F: Fn(Arc<dyn KvStore>) -> Fut,
    Fut: Future<Output = ()>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    eprintln!("testing in-memory store");
    runtime.block_on(f(Arc::new(MemoryStore::default())));

    if let Ok(admin_url) = std::env::var("TEST_DB_URL") {
        eprintln!("\n\ntesting Postgres");
        runtime.block_on(async {
            let (ctx, store) = PgContext::create(&admin_url).await;
            f(Arc::new(store)).await;
            ctx.drop_database().await;
        });
    } else if std::env::var_os("CI").is_some() {
        panic!("TEST_DB_URL must be set in CI");
    }
}

use std::str::FromStr;
use std::sync::Arc;

use argon2::Params;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};

use crate::app::App;
use crate::backend::Backend;
use crate::credentials::Credentials;

pub async fn create_db() -> Pool<Sqlite> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);

    // every connection to :memory: is a fresh database, so only ever have one
    let db = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&db).await.unwrap();

    db
}

pub fn credentials() -> Credentials {
    Credentials::with_params(Params::new(8, 1, 1, None).unwrap()).unwrap()
}

pub async fn create_app() -> Arc<App> {
    let backend = Backend::with_pool(create_db().await).await.unwrap();

    Arc::new(App::new(backend, credentials()))
}

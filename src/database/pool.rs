use std::path::Path;

use anyhow::Context;
use deadpool::managed::{self, Pool, RecycleError};
use libsql::{Builder, Error};

use super::tables::initialize_database;

#[derive(Debug)]
pub struct Manager {
    path: String,
}

impl Manager {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_string_lossy().into_owned(),
        }
    }
}

impl managed::Manager for Manager {
    type Type = libsql::Connection;
    type Error = Error;

    async fn create(&self) -> Result<Self::Type, Error> {
        let db = Builder::new_local(&self.path).build().await?;
        let conn = db.connect()?;
        initialize_database(&conn).await?;
        Ok(conn)
    }

    async fn recycle(
        &self,
        conn: &mut Self::Type,
        _: &managed::Metrics,
    ) -> managed::RecycleResult<Error> {
        conn.query("SELECT 1", ())
            .await
            .map_err(|e| RecycleError::Message(format!("{}", e).into()))?
            .next()
            .await
            .map_err(|e| RecycleError::Message(format!("{}", e).into()))?
            .ok_or_else(|| RecycleError::Message("No rows returned".into()))?;
        Ok(())
    }
}

pub async fn new_pool(path: &Path) -> anyhow::Result<Pool<Manager>> {
    let manager = Manager::new(path);
    Pool::builder(manager)
        .max_size(10)
        .build()
        .context("Failed to build database pool")
}

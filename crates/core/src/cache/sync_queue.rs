//! Queue of requests waiting for a background sync replay.
//!
//! Entries are keyed by sync tag and survive generation purges, so a
//! deployment never drops an unsent form submission.

use super::connection::CacheDb;
use crate::Error;
use crate::http::Request;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A queued request awaiting successful replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PendingSync {
    pub id: i64,
    pub tag: String,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: String,
}

impl PendingSync {
    /// Rebuild the request to replay.
    pub fn to_request(&self) -> Request {
        Request {
            method: self.method.clone(),
            url: self.url.clone(),
            destination: Default::default(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

impl CacheDb {
    /// Queue a request for replay under a sync tag.
    ///
    /// Returns the id of the new task.
    pub async fn enqueue_sync(&self, tag: &str, request: &Request) -> Result<i64, Error> {
        let tag = tag.to_string();
        let method = request.method.to_ascii_uppercase();
        let url = request.url.clone();
        let headers_json = serde_json::to_string(&request.headers)?;
        let body = request.body.clone();
        let created_at = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<i64, Error> {
                conn.execute(
                    "INSERT INTO sync_queue (tag, method, url, headers_json, body, created_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![tag, method, url, headers_json, body, created_at],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(Error::from)
    }

    /// Tasks queued under a tag, oldest first.
    pub async fn pending_sync(&self, tag: &str) -> Result<Vec<PendingSync>, Error> {
        let tag = tag.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<PendingSync>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT id, tag, method, url, headers_json, body, attempts, last_error, created_at
                     FROM sync_queue WHERE tag = ?1 ORDER BY id",
                )?;
                let rows = stmt
                    .query_map(params![tag], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, Option<Vec<u8>>>(5)?,
                            row.get::<_, u32>(6)?,
                            row.get::<_, Option<String>>(7)?,
                            row.get::<_, String>(8)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                let mut tasks = Vec::with_capacity(rows.len());
                for (id, tag, method, url, headers_json, body, attempts, last_error, created_at) in rows {
                    let headers = serde_json::from_str(&headers_json)?;
                    tasks.push(PendingSync { id, tag, method, url, headers, body, attempts, last_error, created_at });
                }
                Ok(tasks)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a task after a successful replay.
    pub async fn remove_sync(&self, id: i64) -> Result<bool, Error> {
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM sync_queue WHERE id = ?1", params![id])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Record a failed replay and return the new attempt count.
    pub async fn record_sync_failure(&self, id: i64, error: &str) -> Result<u32, Error> {
        let error = error.to_string();
        self.conn
            .call(move |conn| -> Result<u32, Error> {
                conn.execute(
                    "UPDATE sync_queue SET attempts = attempts + 1, last_error = ?2 WHERE id = ?1",
                    params![id, error],
                )?;
                let attempts: u32 =
                    conn.query_row("SELECT attempts FROM sync_queue WHERE id = ?1", params![id], |row| row.get(0))?;
                Ok(attempts)
            })
            .await
            .map_err(Error::from)
    }
}

//! Store and entry operations for the SQLite backend.

use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::SqliteStorage;
use crate::Error;
use crate::key::RequestKey;
use crate::message::Response;
use crate::store::{CacheStorage, CachedResponse, decode_headers, decode_status, encode_headers};

/// Raw entry columns: status, headers_json, body, stored_at.
type EntryRow = (i64, String, Vec<u8>, String);

fn decode_entry((status, headers_json, body, stored_at): EntryRow) -> Result<CachedResponse, Error> {
    let stored_at = DateTime::parse_from_rfc3339(&stored_at)
        .map_err(|e| Error::Store(format!("invalid stored_at {stored_at}: {e}")))?
        .with_timezone(&Utc);

    Ok(CachedResponse {
        response: Response {
            status: decode_status(status)?,
            headers: decode_headers(&headers_json)?,
            body: body.into(),
        },
        stored_at,
    })
}

#[async_trait::async_trait]
impl CacheStorage for SqliteStorage {
    async fn open(&self, store: &str) -> Result<(), Error> {
        let store = store.to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![store, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let store = store.to_string();
        let hash = key.digest();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let result = conn.query_row(
                    "SELECT status, headers_json, body, stored_at
                     FROM entries WHERE store = ?1 AND key_hash = ?2",
                    params![store, hash],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        row.map(decode_entry).transpose()
    }

    async fn put(&self, store: &str, key: &RequestKey, entry: CachedResponse) -> Result<(), Error> {
        let store = store.to_string();
        let hash = key.digest();
        let method = key.method().to_string();
        let url = key.url().to_string();
        let status = i64::from(entry.response.status.as_u16());
        let headers_json = encode_headers(&entry.response.headers);
        let body = entry.response.body.to_vec();
        let stored_at = entry.stored_at.to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![&store, &stored_at],
                )?;
                tx.execute(
                    "INSERT INTO entries (store, key_hash, method, url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(store, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![&store, &hash, &method, &url, status, &headers_json, &body, &stored_at],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, store: &str) -> Result<bool, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![store])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn entry_count(&self, store: &str) -> Result<usize, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE store = ?1", params![store], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(Error::from)
    }
}

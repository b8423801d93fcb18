use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use warden_core::{CacheStore, Error, Result};

const SCAN_BATCH: usize = 100;

/// [`CacheStore`] over Redis hashes with a key-level TTL.
#[derive(Clone)]
pub struct RedisCacheStore {
    conn: MultiplexedConnection,
}

impl RedisCacheStore {
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    /// Walk the fields of `key` matching `pattern`, stopping once `visit`
    /// returns `false`.
    async fn scan_matching(
        &self,
        key: &str,
        pattern: &str,
        mut visit: impl FnMut(Vec<u8>, Vec<u8>) -> bool + Send,
    ) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;

        loop {
            let (next, entries): (u64, Vec<Vec<u8>>) = redis::cmd("HSCAN")
                .arg(key)
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| Error::unexpected("redis HSCAN", e))?;

            let mut entries = entries.into_iter();
            while let (Some(field), Some(value)) = (entries.next(), entries.next()) {
                if !visit(field, value) {
                    return Ok(());
                }
            }

            if next == 0 {
                return Ok(());
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::unexpected("redis HGET", e))
    }

    async fn hash_set(&self, key: &str, field: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .cmd("HSET")
            .arg(key)
            .arg(field)
            .arg(value)
            .ignore()
            .cmd("EXPIRE")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::unexpected("redis HSET", e))?;

        Ok(())
    }

    async fn hash_find(&self, key: &str, pattern: &str) -> Result<Option<Vec<u8>>> {
        let mut found = None;
        self.scan_matching(key, pattern, |_, value| {
            found = Some(value);
            false
        })
        .await?;

        Ok(found)
    }

    async fn hash_delete_matching(&self, key: &str, pattern: &str) -> Result<u64> {
        let mut fields = Vec::new();
        self.scan_matching(key, pattern, |field, _| {
            fields.push(field);
            true
        })
        .await?;

        if fields.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        redis::cmd("HDEL")
            .arg(key)
            .arg(fields)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::unexpected("redis HDEL", e))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Error::unexpected("redis DEL", e))?;

        Ok(())
    }
}

use std::{collections::HashMap, sync::LazyLock};

use async_trait::async_trait;
use passkeep_core::error::StorageError;
use redis::{AsyncCommands, RedisError, Script, aio::MultiplexedConnection};

use crate::backend::KeyValueBackend;

/// Deletes `KEYS[1]` when its hash field `ARGV[1]` equals `ARGV[2]`.
static COMPARE_AND_DELETE: LazyLock<Script> = LazyLock::new(|| {
    Script::new(
        r"
if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then
    return redis.call('DEL', KEYS[1])
end
return 0
",
    )
});

/// [`KeyValueBackend`] over a multiplexed Redis connection
///
/// The selected database is state of the connection, so a `RedisBackend` is not
/// `Clone`: every store connects on its own.
pub struct RedisBackend {
    connection: MultiplexedConnection,
}

impl RedisBackend {
    pub fn new(connection: MultiplexedConnection) -> Self {
        Self { connection }
    }

    /// Open a multiplexed connection to the server at `url`
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(url).map_err(|e| {
            tracing::error!(error = %e, "Invalid Redis connection URL");
            StorageError::Connection(format!("invalid Redis URL: {e}"))
        })?;

        let connection = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to connect to Redis");
                StorageError::Connection(e.to_string())
            })?;

        tracing::debug!("Connected to Redis");
        Ok(Self::new(connection))
    }
}

fn map_redis_error(operation: &'static str, e: RedisError) -> StorageError {
    tracing::error!(error = %e, operation, "Redis command failed");
    if e.is_connection_refusal() || e.is_connection_dropped() || e.is_io_error() {
        StorageError::Connection(format!("{operation}: {e}"))
    } else {
        StorageError::Database(format!("{operation}: {e}"))
    }
}

#[async_trait]
impl KeyValueBackend for RedisBackend {
    async fn select(&self, index: u32) -> Result<(), StorageError> {
        let mut connection = self.connection.clone();
        let _: () = redis::cmd("SELECT")
            .arg(index)
            .query_async(&mut connection)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, database_index = index, "Failed to select database");
                StorageError::Select(e.to_string())
            })?;
        Ok(())
    }

    async fn hash_get_all(&self, key: &str) -> Result<HashMap<String, String>, StorageError> {
        let mut connection = self.connection.clone();
        connection
            .hgetall(key)
            .await
            .map_err(|e| map_redis_error("HGETALL", e))
    }

    async fn hash_set(&self, key: &str, fields: &[(String, String)]) -> Result<(), StorageError> {
        let mut connection = self.connection.clone();
        let _: () = connection
            .hset_multiple(key, fields)
            .await
            .map_err(|e| map_redis_error("HSET", e))?;
        Ok(())
    }

    async fn expire(&self, key: &str, seconds: u64) -> Result<(), StorageError> {
        let seconds = i64::try_from(seconds)
            .map_err(|_| StorageError::Database(format!("EXPIRE: {seconds}s is out of range")))?;

        let mut connection = self.connection.clone();
        let _: () = connection
            .expire(key, seconds)
            .await
            .map_err(|e| map_redis_error("EXPIRE", e))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut connection = self.connection.clone();
        let _: () = connection
            .del(key)
            .await
            .map_err(|e| map_redis_error("DEL", e))?;
        Ok(())
    }

    async fn compare_and_delete(
        &self,
        key: &str,
        field: &str,
        expected: &str,
    ) -> Result<bool, StorageError> {
        let mut connection = self.connection.clone();
        let deleted: i64 = COMPARE_AND_DELETE
            .key(key)
            .arg(field)
            .arg(expected)
            .invoke_async(&mut connection)
            .await
            .map_err(|e| map_redis_error("EVALSHA", e))?;
        Ok(deleted == 1)
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>, StorageError> {
        let mut connection = self.connection.clone();
        connection
            .keys(pattern)
            .await
            .map_err(|e| map_redis_error("KEYS", e))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        let mut connection = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut connection)
            .await
            .map_err(|e| map_redis_error("PING", e))?;
        Ok(())
    }
}

//! The typed gateway over the external record store.
//!
//! The store itself is a key/value + set service with hash, set and
//! expiry primitives (a Redis server, reached via the `redis` crate).
//! [`StoreGateway`] is the seam between that untyped protocol and the rest
//! of the system: every caller outside this crate only ever sees
//! [`taskwheel_proto::TaskRequest`]/[`taskwheel_proto::TaskResult`], never
//! a raw `HMGET` reply.
//!
//! Error philosophy, matching the rest of this workspace's store-adjacent
//! code: a failed round-trip to the backend is always reported as
//! [`StoreError::Backend`] and never silently swallowed, but "no work" and
//! "the record expired between the set-pop and the hash read" are *not*
//! errors — both surface as `Ok(None)`, since the broker and worker treat
//! them identically (move on to the next iteration).

mod record;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use taskwheel_proto::{TaskRequest, TaskResult};

pub use record::{decode_request, decode_result, request_to_fields, result_to_fields, REQUEST_FIELDS, RESULT_FIELDS};

/// Set of uuids pending execution.
pub const REQUEST_UUID_SET: &str = "request_uuid_set";
/// Set of uuids whose most recent execution failed and may be retryable.
pub const FAIL_RESULT_UUID_SET: &str = "fail_result_uuid_set";

pub fn request_key(uuid: &str) -> String {
    format!("t_{uuid}")
}

pub fn result_key(uuid: &str) -> String {
    format!("r_{uuid}")
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[from] redis::RedisError),
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),
}

/// The six primitives of the store contract, typed.
///
/// Implemented by [`RedisGateway`] in production and by an in-memory fake
/// in tests (see `taskwheel_store::fake`), so the broker/worker code paths
/// under test are identical to the production ones minus the network hop.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Write `t_<uuid>` and add `uuid` to the pending set. Fails loudly on
    /// either step — a crash in between may leave an orphan hash with no
    /// set membership, which is acceptable (see module docs on the
    /// `PutRequest` + set-add race).
    async fn put_request(&self, req: &TaskRequest) -> Result<(), StoreError>;

    /// Pop a uuid from the pending set, read and delete its hash. Returns
    /// `Ok(None)` both when the set was empty ("no work") and when the
    /// popped uuid's hash had already expired — callers cannot and need
    /// not distinguish the two.
    async fn take_request(&self) -> Result<Option<TaskRequest>, StoreError>;

    /// Write `r_<uuid>` with a TTL of `ttl` seconds. If `is_success == 0`,
    /// also add `uuid` to the fail set.
    async fn put_result(&self, result: &TaskResult, ttl: u64) -> Result<(), StoreError>;

    /// Pop a uuid from the fail set, read and delete its result hash,
    /// returning the request portion for the caller to re-evaluate against
    /// its retry schedule. `Ok(None)` covers both "no work" and "expired".
    async fn take_fail(&self) -> Result<Option<TaskRequest>, StoreError>;

    /// Read `{is_success, result}` of `r_<uuid>`. `Ok(None)` means the
    /// result does not exist (not yet written, or already expired) — a
    /// definite, non-error "not present".
    async fn get_result_for_client(&self, uuid: &str) -> Result<Option<(u8, String)>, StoreError>;

    /// Health check used at startup.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Production gateway backed by a real Redis server.
#[derive(Clone)]
pub struct RedisGateway {
    conn: ConnectionManager,
}

impl RedisGateway {
    /// Connect to `redis_url` (e.g. `redis://host:port/0`).
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl StoreGateway for RedisGateway {
    async fn put_request(&self, req: &TaskRequest) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = request_key(&req.uuid);
        let fields = request_to_fields(req);
        let _: () = conn.hset_multiple(&key, &fields).await?;
        let _: () = conn.sadd(REQUEST_UUID_SET, &req.uuid).await?;
        Ok(())
    }

    async fn take_request(&self) -> Result<Option<TaskRequest>, StoreError> {
        let mut conn = self.conn.clone();
        let uuid: Option<String> = conn.spop(REQUEST_UUID_SET).await?;
        let Some(uuid) = uuid else {
            return Ok(None);
        };
        let key = request_key(&uuid);
        let values: Vec<Option<String>> = conn.hget(&key, &REQUEST_FIELDS[..]).await?;
        let _: () = conn.del(&key).await?;
        match decode_request(&values)? {
            Some(req) => Ok(Some(req)),
            None => {
                tracing::debug!(uuid = %uuid, "request hash expired before it could be taken");
                Ok(None)
            }
        }
    }

    async fn put_result(&self, result: &TaskResult, ttl: u64) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let key = result_key(&result.request.uuid);
        let fields = result_to_fields(result);
        let _: () = conn.hset_multiple(&key, &fields).await?;
        if result.is_success == 0 {
            let _: () = conn.sadd(FAIL_RESULT_UUID_SET, &result.request.uuid).await?;
        }
        let _: () = conn.expire(&key, ttl as i64).await?;
        Ok(())
    }

    async fn take_fail(&self) -> Result<Option<TaskRequest>, StoreError> {
        let mut conn = self.conn.clone();
        let uuid: Option<String> = conn.spop(FAIL_RESULT_UUID_SET).await?;
        let Some(uuid) = uuid else {
            return Ok(None);
        };
        let key = result_key(&uuid);
        let values: Vec<Option<String>> = conn.hget(&key, &RESULT_FIELDS[..]).await?;
        let _: () = conn.del(&key).await?;
        match decode_result(&values)? {
            Some((req, _is_success, _result)) => Ok(Some(req)),
            None => {
                tracing::debug!(uuid = %uuid, "result hash expired before it could be retried");
                Ok(None)
            }
        }
    }

    async fn get_result_for_client(&self, uuid: &str) -> Result<Option<(u8, String)>, StoreError> {
        let mut conn = self.conn.clone();
        let key = result_key(uuid);
        let values: Vec<Option<String>> = conn.hget(&key, &["is_success", "result"]).await?;
        if values.iter().all(Option::is_none) {
            return Ok(None);
        }
        let is_success: u8 = values[0]
            .as_deref()
            .ok_or_else(|| StoreError::InvalidRecord("missing field is_success".into()))?
            .parse()
            .map_err(|_| StoreError::InvalidRecord("is_success is not an integer".into()))?;
        let result = values[1].clone().unwrap_or_default();
        Ok(Some((is_success, result)))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

pub mod fake;

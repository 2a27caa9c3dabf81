//! An in-memory [`StoreGateway`] for tests, with the same "no work" vs
//! "expired" vs "error" semantics as [`crate::RedisGateway`] but without a
//! network round-trip. Broker and worker unit/integration tests run their
//! production code paths against this, never against a live Redis server.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use taskwheel_proto::{TaskRequest, TaskResult};

use crate::{StoreError, StoreGateway};

struct ResultRecord {
    request: TaskRequest,
    is_success: u8,
    result: String,
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    requests: HashMap<String, TaskRequest>,
    results: HashMap<String, ResultRecord>,
    pending: Vec<String>,
    failed: Vec<String>,
}

/// An in-memory stand-in for the real store, good enough to exercise every
/// invariant in the contract (including the expiry race) deterministically.
#[derive(Default)]
pub struct FakeGateway {
    inner: Mutex<Inner>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force `t_<uuid>` to be gone without clearing its pending-set
    /// membership, simulating the race the real store can expose between
    /// `SPOP` and the hash read.
    pub fn expire_request(&self, uuid: &str) {
        self.inner.lock().unwrap().requests.remove(uuid);
    }

    /// Force `r_<uuid>` to be gone without clearing its fail-set
    /// membership, mirroring [`Self::expire_request`] for results.
    pub fn expire_result(&self, uuid: &str) {
        self.inner.lock().unwrap().results.remove(uuid);
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    pub fn failed_count(&self) -> usize {
        self.inner.lock().unwrap().failed.len()
    }
}

#[async_trait]
impl StoreGateway for FakeGateway {
    async fn put_request(&self, req: &TaskRequest) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.requests.insert(req.uuid.clone(), req.clone());
        inner.pending.push(req.uuid.clone());
        Ok(())
    }

    async fn take_request(&self) -> Result<Option<TaskRequest>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(uuid) = inner.pending.pop() else {
            return Ok(None);
        };
        match inner.requests.remove(&uuid) {
            Some(req) => Ok(Some(req)),
            None => {
                tracing::debug!(uuid = %uuid, "request hash expired before it could be taken");
                Ok(None)
            }
        }
    }

    async fn put_result(&self, result: &TaskResult, ttl: u64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let uuid = result.request.uuid.clone();
        inner.results.insert(
            uuid.clone(),
            ResultRecord {
                request: result.request.clone(),
                is_success: result.is_success,
                result: result.result.clone(),
                expires_at: Instant::now() + Duration::from_secs(ttl),
            },
        );
        if result.is_success == 0 {
            inner.failed.push(uuid);
        }
        Ok(())
    }

    async fn take_fail(&self) -> Result<Option<TaskRequest>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(uuid) = inner.failed.pop() else {
            return Ok(None);
        };
        match inner.results.remove(&uuid) {
            Some(record) if record.expires_at > Instant::now() => Ok(Some(record.request)),
            _ => {
                tracing::debug!(uuid = %uuid, "result hash expired before it could be retried");
                Ok(None)
            }
        }
    }

    async fn get_result_for_client(&self, uuid: &str) -> Result<Option<(u8, String)>, StoreError> {
        let inner = self.inner.lock().unwrap();
        match inner.results.get(uuid) {
            Some(record) if record.expires_at > Instant::now() => {
                Ok(Some((record.is_success, record.result.clone())))
            }
            _ => Ok(None),
        }
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

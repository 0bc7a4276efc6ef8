//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::delivery::Delivery;
use crate::error::{Result, SyncError};

/// Accepts every payload except those carrying `"fail": true`.
#[derive(Default)]
pub struct MockDelivery {
    delivered: Mutex<Vec<Value>>,
    calls: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    fail_all: bool,
}

impl MockDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    /// Every call waits for a permit on `gate` before answering.
    pub fn gated(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn delivered(&self) -> Vec<Value> {
        self.delivered.lock().unwrap().clone()
    }
}

#[async_trait]
impl Delivery for MockDelivery {
    async fn deliver(&self, payload: &Value) -> Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if self.fail_all || payload.get("fail") == Some(&Value::Bool(true)) {
            return Err(SyncError::DeliveryFailure {
                status: Some(503),
                reason: "service unavailable".into(),
            });
        }
        self.delivered.lock().unwrap().push(payload.clone());
        Ok(json!({"status": "ok"}))
    }
}

//! Testing utilities for dstore workspace
//!
//! Shared test helpers, fixtures, and an instrumented store.

#![allow(missing_docs)]

use async_trait::async_trait;
use dstore_core::{MemoryStore, RecordAddress, RemoteStore, TransportError};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Store wrapper that counts calls, adds latency and injects failures
#[derive(Debug, Clone, Default)]
pub struct InstrumentedStore {
    inner: MemoryStore,
    latency: Duration,
    get_response_delay: Duration,
    gets: Arc<AtomicUsize>,
    puts: Arc<AtomicUsize>,
    failing_gets: Arc<AtomicUsize>,
    failing_puts: Arc<AtomicUsize>,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps this long before touching the documents
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Every get reads the document, then waits this long before answering
    #[must_use]
    pub fn with_get_response_delay(mut self, delay: Duration) -> Self {
        self.get_response_delay = delay;
        self
    }

    #[must_use]
    pub fn seeded(self, address: &RecordAddress, value: Value) -> Self {
        self.inner.seed(address.clone(), value);
        self
    }

    /// The next `n` gets fail with `TransportError::Unavailable`
    pub fn fail_next_gets(&self, n: usize) {
        self.failing_gets.store(n, Ordering::SeqCst);
    }

    /// The next `n` puts fail with `TransportError::Unavailable`
    pub fn fail_next_puts(&self, n: usize) {
        self.failing_puts.store(n, Ordering::SeqCst);
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn current(&self, address: &RecordAddress) -> Option<Value> {
        self.inner.current(address)
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl RemoteStore for InstrumentedStore {
    async fn get(&self, address: &RecordAddress) -> Result<Option<Value>, TransportError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if take_failure(&self.failing_gets) {
            return Err(TransportError::unavailable(address, "injected get failure"));
        }
        let value = self.inner.get(address).await;
        if !self.get_response_delay.is_zero() {
            tokio::time::sleep(self.get_response_delay).await;
        }
        value
    }

    async fn put(&self, address: &RecordAddress, value: &Value) -> Result<(), TransportError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if take_failure(&self.failing_puts) {
            return Err(TransportError::unavailable(address, "injected put failure"));
        }
        self.inner.put(address, value).await
    }
}

pub fn todos_address() -> RecordAddress {
    RecordAddress::new("maintenance", "todos").unwrap()
}

pub fn todos_value(items: &[&str]) -> Value {
    json!({ "todos": items })
}

/// Store holding `{ "todos": items }` at `maintenance/todos`
pub fn seeded_store(items: &[&str]) -> InstrumentedStore {
    InstrumentedStore::new().seeded(&todos_address(), todos_value(items))
}

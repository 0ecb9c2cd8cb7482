//! Shared fixtures for integration tests: an in-memory atomic scope, a
//! scriptable notification handler and signed callback payloads.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use platron_gateway::payments::{
    AtomicScope, Disposition, Endpoint, GatewayConfig, GatewayEvent, NotificationHandler,
    ParameterSet, SignatureEngine,
};
use platron_gateway::GatewayResult;

pub const ACCOUNT_ID: &str = "42";
pub const SECRET: &str = "topsecret";
pub const RESULT_URL: &str = "https://shop.example/platron/result";

pub fn gateway_config() -> Arc<GatewayConfig> {
    Arc::new(
        GatewayConfig::builder(ACCOUNT_ID, SECRET)
            .result_url(RESULT_URL)
            .build()
            .expect("valid gateway config"),
    )
}

/// Callback fields as the gateway would post them, signed for `endpoint`.
pub fn signed_callback(endpoint: &str, order_id: &str) -> ParameterSet {
    let config = gateway_config();
    let mut params = ParameterSet::new()
        .with("pg_order_id", order_id)
        .with("pg_payment_id", "9001")
        .with("pg_amount", "10.00")
        .with("pg_currency", "RUR")
        .with("pg_result", "1")
        .with("pg_can_reject", "1")
        .with("pg_salt", "callback-salt");
    let endpoint = Endpoint::new(endpoint).expect("endpoint");
    SignatureEngine::new(config.digest()).attach(&endpoint, &mut params, config.secret_key());
    params
}

#[derive(Debug, Default)]
pub struct MemoryTx {
    pub writes: Vec<String>,
}

/// Atomic scope that keeps committed writes in memory.
#[derive(Clone, Default)]
pub struct MemoryScope {
    pub committed: Arc<Mutex<Vec<String>>>,
    pub begun: Arc<AtomicUsize>,
    pub rolled_back: Arc<AtomicUsize>,
}

impl MemoryScope {
    pub fn committed(&self) -> Vec<String> {
        self.committed.lock().unwrap().clone()
    }

    pub fn rollbacks(&self) -> usize {
        self.rolled_back.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AtomicScope for MemoryScope {
    type Transaction = MemoryTx;

    async fn begin(&self) -> GatewayResult<MemoryTx> {
        self.begun.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryTx::default())
    }

    async fn commit(&self, tx: MemoryTx) -> GatewayResult<()> {
        self.committed.lock().unwrap().extend(tx.writes);
        Ok(())
    }

    async fn rollback(&self, _tx: MemoryTx) -> GatewayResult<()> {
        self.rolled_back.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Handler returning a fixed disposition and writing the order id on settle.
pub struct RecordingHandler {
    disposition: Disposition,
    fail_settle: bool,
    panic_settle: bool,
    pub inspected: AtomicUsize,
    pub settled: AtomicUsize,
}

impl RecordingHandler {
    pub fn new(disposition: Disposition) -> Self {
        Self {
            disposition,
            fail_settle: false,
            panic_settle: false,
            inspected: AtomicUsize::new(0),
            settled: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_settle: true,
            ..Self::new(Disposition::Handled)
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic_settle: true,
            ..Self::new(Disposition::Handled)
        }
    }

    pub fn inspections(&self) -> usize {
        self.inspected.load(Ordering::SeqCst)
    }

    pub fn settlements(&self) -> usize {
        self.settled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationHandler<MemoryTx> for RecordingHandler {
    async fn inspect(&self, _event: &GatewayEvent) -> Disposition {
        self.inspected.fetch_add(1, Ordering::SeqCst);
        self.disposition.clone()
    }

    async fn settle(&self, event: &GatewayEvent, tx: &mut MemoryTx) -> anyhow::Result<()> {
        self.settled.fetch_add(1, Ordering::SeqCst);
        tx.writes
            .push(event.order_id().unwrap_or_default().to_string());
        if self.panic_settle {
            panic!("ledger row missing for {}", event.order_id().unwrap_or_default());
        }
        if self.fail_settle {
            anyhow::bail!("order ledger unavailable");
        }
        Ok(())
    }
}

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::{
    sequencer::{ReplayReport, Sequencer},
    types::{EventReceipt, PoolEvent, PoolState, PoolSummary, Result, TradeEvent, TradeReceipt},
};

/// Pool shared between one writer and any number of readers.
///
/// Every write computes the successor state from a snapshot and swaps it in
/// only on success, so readers never observe a half-applied event.
#[derive(Clone)]
pub struct SharedPool {
    state: Arc<RwLock<PoolState>>,
    sequencer: Arc<Sequencer>,
}

impl SharedPool {
    pub fn new(state: PoolState, sequencer: Sequencer) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            sequencer: Arc::new(sequencer),
        }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub async fn snapshot(&self) -> PoolState {
        self.state.read().await.clone()
    }

    pub async fn summary(&self) -> Result<PoolSummary> {
        let state = self.state.read().await;
        PoolSummary::from_state(&state, self.sequencer.math())
    }

    /// Preview a trade against the current state.
    pub async fn quote(&self, event: &TradeEvent) -> Result<TradeReceipt> {
        let state = self.state.read().await;
        self.sequencer
            .curve()
            .quote_trade(&state, self.sequencer.params(), event)
    }

    pub async fn apply(&self, event: &PoolEvent) -> Result<EventReceipt> {
        let mut state = self.state.write().await;
        let (next, receipt) = self.sequencer.step(&state, event)?;
        *state = next;
        debug!("Committed {} event at t={}", event.kind_str(), event.time());
        Ok(receipt)
    }

    /// Apply all events or none of them.
    pub async fn apply_batch(&self, events: &[PoolEvent]) -> Result<Vec<EventReceipt>> {
        let mut state = self.state.write().await;
        let (next, receipts) = self.sequencer.run_with_receipts(&state, events)?;
        *state = next;
        info!("Committed batch of {} events", receipts.len());
        Ok(receipts)
    }

    /// Apply every event that succeeds and report the rest.
    pub async fn replay(&self, events: &[PoolEvent]) -> ReplayReport {
        let mut state = self.state.write().await;
        let report = self.sequencer.replay(&state, events);
        *state = report.final_state.clone();
        report
    }
}

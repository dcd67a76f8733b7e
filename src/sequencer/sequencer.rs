use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    curve::{BondingCurve, apply_deposit, apply_withdraw},
    math::FixedMath,
    types::{AmmError, CurveParameters, ErrorKind, EventReceipt, PoolEvent, PoolState, Result},
};

/// A rejected event in a replay.
#[derive(Debug)]
pub struct Rejection {
    pub index: usize,
    pub error: AmmError,
}

#[derive(Debug)]
pub struct ReplayReport {
    pub final_state: PoolState,
    pub receipts: Vec<(usize, EventReceipt)>,
    pub rejected: Vec<Rejection>,
}

/// Serializable digest of a replay for logs and summaries.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayStats {
    pub applied: usize,
    pub rejected: usize,
    pub rejected_kinds: Vec<(usize, ErrorKind)>,
}

impl ReplayReport {
    pub fn stats(&self) -> ReplayStats {
        ReplayStats {
            applied: self.receipts.len(),
            rejected: self.rejected.len(),
            rejected_kinds: self.rejected.iter().map(|r| (r.index, r.error.kind())).collect(),
        }
    }
}

/// Applies events to a pool strictly in the order given.
#[derive(Debug, Clone)]
pub struct Sequencer {
    curve: BondingCurve,
    params: CurveParameters,
}

impl Sequencer {
    pub fn new(curve: BondingCurve, params: CurveParameters) -> Result<Self> {
        params.validate(curve.math())?;
        Ok(Self { curve, params })
    }

    pub fn math(&self) -> &FixedMath {
        self.curve.math()
    }

    pub fn curve(&self) -> &BondingCurve {
        &self.curve
    }

    pub fn params(&self) -> &CurveParameters {
        &self.params
    }

    /// Apply one event, returning the successor state.
    pub fn step(&self, state: &PoolState, event: &PoolEvent) -> Result<(PoolState, EventReceipt)> {
        let math = self.curve.math();
        match event {
            PoolEvent::Trade(trade) => self
                .curve
                .apply_trade(state, &self.params, trade)
                .map(|(next, receipt)| (next, EventReceipt::Trade(receipt))),
            PoolEvent::Deposit(deposit) => {
                apply_deposit(math, state, deposit).map(|(next, receipt)| (next, EventReceipt::Deposit(receipt)))
            }
            PoolEvent::Withdraw(withdraw) => {
                apply_withdraw(math, state, withdraw).map(|(next, receipt)| (next, EventReceipt::Withdraw(receipt)))
            }
        }
    }

    /// Fold `events` over `state`, stopping at the first failure.
    pub fn run(&self, state: &PoolState, events: &[PoolEvent]) -> Result<PoolState> {
        self.run_with_receipts(state, events).map(|(state, _)| state)
    }

    pub fn run_with_receipts(
        &self,
        state: &PoolState,
        events: &[PoolEvent],
    ) -> Result<(PoolState, Vec<EventReceipt>)> {
        let mut current = state.clone();
        let mut receipts = Vec::with_capacity(events.len());
        for (index, event) in events.iter().enumerate() {
            let (next, receipt) = self
                .step(&current, event)
                .map_err(|e| AmmError::at_index(index, e))?;
            current = next;
            receipts.push(receipt);
        }
        debug!("Applied {} events", receipts.len());
        Ok((current, receipts))
    }

    /// Apply every event, skipping the ones that fail.
    pub fn replay(&self, state: &PoolState, events: &[PoolEvent]) -> ReplayReport {
        let mut current = state.clone();
        let mut receipts = Vec::new();
        let mut rejected = Vec::new();

        for (index, event) in events.iter().enumerate() {
            match self.step(&current, event) {
                Ok((next, receipt)) => {
                    current = next;
                    receipts.push((index, receipt));
                }
                Err(error) => {
                    warn!("Rejected {} event #{} at t={}: {}", event.kind_str(), index, event.time(), error);
                    rejected.push(Rejection { index, error });
                }
            }
        }

        info!(
            "Replay finished: {} applied, {} rejected",
            receipts.len(),
            rejected.len()
        );
        ReplayReport {
            final_state: current,
            receipts,
            rejected,
        }
    }
}

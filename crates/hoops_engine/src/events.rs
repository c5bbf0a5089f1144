use std::sync::mpsc;

use hoops_core::EntityKind;
use hoops_logging::{hoops_debug, hoops_info, hoops_warn};

use crate::store::WriteMode;
use crate::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Units,
    Listings,
    Details,
}

/// Observations emitted while harvesting, so drop and fallback rates stay
/// visible without changing what gets harvested.
#[derive(Debug, Clone, PartialEq)]
pub enum HarvestEvent {
    StageStarted {
        stage: Stage,
        items: usize,
    },
    RowsDropped {
        stage: Stage,
        reason: &'static str,
        count: usize,
    },
    ItemSkipped {
        stage: Stage,
        url: String,
        reason: String,
    },
    FallbackUsed {
        url: String,
        role: Role,
        strategy: &'static str,
    },
    RowsPersisted {
        kind: EntityKind,
        rows: usize,
        mode: WriteMode,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

/// Writes every event to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: HarvestEvent) {
        match event {
            HarvestEvent::StageStarted { stage, items } => {
                hoops_info!("{:?} stage started with {} items", stage, items)
            }
            HarvestEvent::RowsDropped {
                stage,
                reason,
                count,
            } => hoops_info!("{:?} stage dropped {} rows: {}", stage, count, reason),
            HarvestEvent::ItemSkipped { stage, url, reason } => {
                hoops_debug!("{:?} stage skipped {}: {}", stage, url, reason)
            }
            HarvestEvent::FallbackUsed {
                url,
                role,
                strategy,
            } => hoops_warn!("{} table for {} located via {}", role, url, strategy),
            HarvestEvent::RowsPersisted { kind, rows, mode } => {
                hoops_debug!("Persisted {} {} rows ({:?})", rows, kind, mode)
            }
        }
    }
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<HarvestEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<HarvestEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: HarvestEvent) {
        let _ = self.tx.send(event);
    }
}

use std::sync::atomic::{AtomicU64, Ordering};

/// Which exchange path an operation belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferPhase {
    Send,
    Receive,
    ReceivePreinlet,
    LocalCommunication,
}

impl TransferPhase {
    pub const ALL: [TransferPhase; 4] = [
        TransferPhase::Send,
        TransferPhase::Receive,
        TransferPhase::ReceivePreinlet,
        TransferPhase::LocalCommunication,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TransferPhase::Send => "send",
            TransferPhase::Receive => "receive",
            TransferPhase::ReceivePreinlet => "receive_preinlet",
            TransferPhase::LocalCommunication => "local_communication",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Exchange counters, safe to share between workers.
#[derive(Debug, Default)]
pub struct TransferStats {
    calls: [AtomicU64; 4],
    records: [AtomicU64; 4],
    identity_overflows: AtomicU64,
}

impl TransferStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, phase: TransferPhase, records: usize) {
        self.calls[phase.index()].fetch_add(1, Ordering::Relaxed);
        self.records[phase.index()].fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn record_overflow(&self) {
        self.identity_overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn calls(&self, phase: TransferPhase) -> u64 {
        self.calls[phase.index()].load(Ordering::Relaxed)
    }

    pub fn records(&self, phase: TransferPhase) -> u64 {
        self.records[phase.index()].load(Ordering::Relaxed)
    }

    pub fn identity_overflows(&self) -> u64 {
        self.identity_overflows.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        for counter in self.calls.iter().chain(self.records.iter()) {
            counter.store(0, Ordering::Relaxed);
        }
        self.identity_overflows.store(0, Ordering::Relaxed);
    }
}

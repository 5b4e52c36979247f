use std::sync::atomic::{AtomicU64, Ordering};

/// Statistics sink threaded through a solve call (spec §6 "statistics
/// sink"). Every counter is an atomic so both the master receive loop and
/// worker threads can record against the same instance without a lock.
#[derive(Debug, Default)]
pub struct SolveStats {
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,
    pub blocks_solved: AtomicU64,
    pub gemm_calls: AtomicU64,
    pub trsm_calls: AtomicU64,
}

impl SolveStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recv(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_block_solved(&self) {
        self.blocks_solved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gemm(&self) {
        self.gemm_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trsm(&self) {
        self.trsm_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }
}

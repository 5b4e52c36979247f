//! One-sided (RMA-style) transport (spec §4.F "One-sided (RMA) variant",
//! §6). Each rank exposes a window laid out as `[Pc+Pr counters] [BC
//! region] [RD region]`; senders `Put` the payload into the receiver's slot
//! and atomically increment the matching counter word *after* the payload
//! is visible. Receivers poll counters to discover new messages rather
//! than matching tags against wildcard receives.
//!
//! Since real RMA windows require an MPI/UCX substrate that is out of
//! scope here (spec §1), this is a same-process simulation: the "window"
//! is a `Mutex`-guarded per-destination queue plus an `AtomicUsize`
//! doorbell counter, shared via `Arc` across the simulated ranks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::message::{Message, MsgTag};
use crate::transport::{SendHandle, Transport};

pub struct OneSidedTransport<E> {
    rank: usize,
    nprocs: usize,
    /// `counters[r]` counts messages deposited into rank `r`'s window —
    /// the doorbell a receiver polls before trusting its queue has new
    /// data.
    counters: Arc<Vec<AtomicUsize>>,
    /// `queues[r]` is rank `r`'s BC‖RD stripe region, collapsed here into
    /// one FIFO per destination (tag is carried in-band rather than via a
    /// separate stripe per tag, since the simulated window has no real
    /// memory-layout constraint to respect).
    queues: Arc<Vec<Mutex<VecDeque<(MsgTag, Message<E>)>>>>,
}

pub fn build_one_sided_cluster<E: Send + 'static>(nprocs: usize) -> Vec<OneSidedTransport<E>> {
    assert!(nprocs > 0, "a transport cluster needs at least one rank");
    let counters: Arc<Vec<AtomicUsize>> =
        Arc::new((0..nprocs).map(|_| AtomicUsize::new(0)).collect());
    let queues: Arc<Vec<Mutex<VecDeque<(MsgTag, Message<E>)>>>> =
        Arc::new((0..nprocs).map(|_| Mutex::new(VecDeque::new())).collect());
    (0..nprocs)
        .map(|rank| OneSidedTransport {
            rank,
            nprocs,
            counters: counters.clone(),
            queues: queues.clone(),
        })
        .collect()
}

impl<E: Send + 'static> Transport<E> for OneSidedTransport<E> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn nprocs(&self) -> usize {
        self.nprocs
    }

    fn send(&self, dest: usize, tag: MsgTag, msg: Message<E>) -> SendHandle {
        // Put the payload first, then bump the counter: the ordering the
        // contract in spec §4.F/§9 requires (payload visible before the
        // counter increment a poller acts on).
        self.queues[dest].lock().unwrap().push_back((tag, msg));
        self.counters[dest].fetch_add(1, Ordering::Release);
        SendHandle
    }

    fn recv_any(&self) -> (MsgTag, Message<E>) {
        loop {
            if let Some(item) = self.queues[self.rank].lock().unwrap().pop_front() {
                return item;
            }
            // Busy-polling on RMA counters (spec §5 "Suspension/blocking
            // points"): yield instead of spinning hot.
            std::thread::yield_now();
        }
    }
}

impl<E> OneSidedTransport<E> {
    /// Total messages ever deposited into this rank's window — exposed for
    /// statistics/tests, not consulted by `recv_any`'s dispatch itself.
    pub fn received_count(&self) -> usize {
        self.counters[self.rank].load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn counter_advances_before_recv_returns() {
        let mut cluster = build_one_sided_cluster::<f64>(2);
        let rank1 = cluster.pop().unwrap();
        let rank0 = cluster.pop().unwrap();

        rank0.send(1, MsgTag::LReduce, Message::new(5, vec![9.0]));
        let (tag, msg) = rank1.recv_any();
        assert!(tag == MsgTag::LReduce);
        assert!(msg.header == 5);
        assert!(rank1.received_count() == 1);
    }
}

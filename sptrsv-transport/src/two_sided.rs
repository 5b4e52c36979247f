//! Two-sided transport: `Recv(source=any, tag=any)` / non-blocking `Send`
//! (spec §6). Simulated with one `std::sync::mpsc` channel per rank, fed by
//! a clone of every other rank's sender — the same main-thread-dispatches,
//! worker-threads-consume idiom the pack's own
//! `genetics-statistics-rqtl2-geno-kinship-rust` worker pool uses
//! (`src/util/kinship.rs::calc_kinship_parallel`), just with every rank
//! both a sender and a receiver instead of a single dispatcher.

use std::sync::mpsc;
use std::sync::Mutex;

use crate::message::{Message, MsgTag};
use crate::transport::{SendHandle, Transport};

pub struct TwoSidedTransport<E> {
    rank: usize,
    nprocs: usize,
    senders: Vec<mpsc::Sender<(MsgTag, Message<E>)>>,
    receiver: Mutex<mpsc::Receiver<(MsgTag, Message<E>)>>,
}

/// Builds one [`TwoSidedTransport`] per simulated rank, fully connected.
/// Index `i` of the returned `Vec` is the transport handle for rank `i`;
/// hand each to the thread/task driving that rank.
pub fn build_two_sided_cluster<E: Send + 'static>(nprocs: usize) -> Vec<TwoSidedTransport<E>> {
    assert!(nprocs > 0, "a transport cluster needs at least one rank");
    let mut senders = Vec::with_capacity(nprocs);
    let mut receivers = Vec::with_capacity(nprocs);
    for _ in 0..nprocs {
        let (tx, rx) = mpsc::channel();
        senders.push(tx);
        receivers.push(rx);
    }
    receivers
        .into_iter()
        .enumerate()
        .map(|(rank, receiver)| TwoSidedTransport {
            rank,
            nprocs,
            senders: senders.clone(),
            receiver: Mutex::new(receiver),
        })
        .collect()
}

impl<E: Send + 'static> Transport<E> for TwoSidedTransport<E> {
    fn rank(&self) -> usize {
        self.rank
    }

    fn nprocs(&self) -> usize {
        self.nprocs
    }

    fn send(&self, dest: usize, tag: MsgTag, msg: Message<E>) -> SendHandle {
        self.senders[dest]
            .send((tag, msg))
            .expect("peer rank's receive loop has already exited");
        SendHandle
    }

    fn recv_any(&self) -> (MsgTag, Message<E>) {
        self.receiver
            .lock()
            .unwrap()
            .recv()
            .expect("no senders remain: every peer dropped its transport handle")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn messages_round_trip_between_two_ranks() {
        let mut cluster = build_two_sided_cluster::<f64>(2);
        let rank1 = cluster.pop().unwrap();
        let rank0 = cluster.pop().unwrap();

        rank0.send(1, MsgTag::LBroadcast, Message::new(3, vec![1.0, 2.0]));
        let (tag, msg) = rank1.recv_any();
        assert!(tag == MsgTag::LBroadcast);
        assert!(msg.header == 3);
        assert!(msg.values == vec![1.0, 2.0]);
    }
}

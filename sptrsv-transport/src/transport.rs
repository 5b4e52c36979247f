use crate::message::{Message, MsgTag};

/// Handle to an in-flight send. `wait` blocks until the local send resource
/// (request slot, spec §4.C `allocateRequest`) is free to reuse. Both
/// concrete transports here complete sends synchronously, so `wait` is a
/// no-op, but the type keeps the "non-blocking send, separately awaited
/// completion" shape of the two-sided contract in spec §6 intact for a
/// future real-MPI implementor of [`Transport`].
#[must_use]
pub struct SendHandle;

impl SendHandle {
    pub fn wait(self) {}
}

/// Abstracts point-to-point delivery between simulated ranks (spec §2
/// component H, §6 "Transport-layer contract"). A real deployment would
/// implement this over MPI two-sided calls or an RMA window; MPI/RMA
/// bindings themselves are out of scope here (spec §1), so the two
/// implementors in this crate simulate a multi-rank cluster in one process.
pub trait Transport<E>: Send + Sync {
    fn rank(&self) -> usize;
    fn nprocs(&self) -> usize;

    /// Sends `msg` to `dest` tagged `tag`. Non-blocking: returns once the
    /// payload is handed to the transport, not once the peer has consumed
    /// it.
    fn send(&self, dest: usize, tag: MsgTag, msg: Message<E>) -> SendHandle;

    /// Blocks until the next message addressed to this rank, on any tag
    /// from any source, is available (spec §6: "`Recv(source=any,
    /// tag=any)` returns one header-prefixed buffer"). This is the *only*
    /// suspension point of the receive loop (spec §5).
    fn recv_any(&self) -> (MsgTag, Message<E>);
}

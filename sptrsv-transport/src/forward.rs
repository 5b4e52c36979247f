//! Glue between a [`crate::tree::BcTree`]/[`crate::tree::RdTree`]'s static
//! topology and a [`Transport`]'s send primitive — the `forwardMessage`/
//! `waitSend` capability set spec §4.C and §9 ask the tree abstraction to
//! expose.

use crate::message::{Message, MsgTag};
use crate::tree::{BcTree, RdTree};
use crate::transport::Transport;

/// Relays a received broadcast message to every child of `tree` (spec
/// §4.F: "relay to the node's children *before* applying updates"). Caller
/// is responsible for calling this ahead of any local compute on `msg`.
pub fn forward_broadcast<E: Clone, T: Transport<E>>(
    transport: &T,
    tree: &BcTree,
    tag: MsgTag,
    msg: &Message<E>,
) {
    if !tree.children().is_empty() {
        tracing::debug!(header = msg.header, children = tree.dest_count(), ?tag, "forwarding broadcast");
    }
    for &child in tree.children() {
        transport
            .send(child, tag, Message::new(msg.header, msg.values.clone()))
            .wait();
    }
}

/// Forwards a folded partial sum up a reduction tree to its parent, or
/// does nothing at the root (spec §4.C: "parents-to-forward-to (reduce,
/// always 1)").
pub fn forward_reduce<E, T: Transport<E>>(transport: &T, tree: &RdTree, tag: MsgTag, msg: Message<E>) {
    if let Some(parent) = tree.parent() {
        tracing::debug!(header = msg.header, parent, ?tag, "folding reduction upward");
        transport.send(parent, tag, msg).wait();
    }
}

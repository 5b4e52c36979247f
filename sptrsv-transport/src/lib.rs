//! Tree topology and point-to-point transport abstractions for the
//! distributed triangular solve: the broadcast/reduction trees a setup
//! routine hands the engines, and the two simulated multi-rank transports
//! (`two_sided`, `one_sided`) that stand in for a real MPI substrate.

pub mod forward;
pub mod message;
pub mod one_sided;
pub mod transport;
pub mod tree;
pub mod two_sided;

pub use forward::{forward_broadcast, forward_reduce};
pub use message::{Message, MsgTag};
pub use one_sided::{build_one_sided_cluster, OneSidedTransport};
pub use transport::{SendHandle, Transport};
pub use tree::{flat_bc_tree, flat_rd_tree, BcTree, RdTree};
pub use two_sided::{build_two_sided_cluster, TwoSidedTransport};

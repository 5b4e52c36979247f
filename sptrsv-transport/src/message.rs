/// Distinguishes the four message classes flowing through one rank during a
/// solve (spec §6: "tags distinguish L-BC, L-RD, U-BC, U-RD").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MsgTag {
    /// L-solve broadcast: `X[K]` propagating down a column's broadcast tree.
    LBroadcast,
    /// L-solve reduce: partial `lsum[I]` folding up a row's reduction tree.
    LReduce,
    /// U-solve broadcast: mirror of `LBroadcast` over U's own tree.
    UBroadcast,
    /// U-solve reduce: mirror of `LReduce` over U's own tree.
    UReduce,
    /// Forward redistribution: one packed `(row, B-row)` entry moving from
    /// a B-owning rank to the diagonal process of its supernode.
    BToX,
    /// Backward redistribution: mirror of `BToX`, X-row moving from a
    /// diagonal process back to the rank that owns it in B's distribution.
    XToB,
}

/// One header-prefixed message payload (spec §4.F "Tie-breaking /
/// ordering": "the header word must be the first word of the message
/// payload"). `header` carries the global supernode id `K` the message is
/// about; `values` is the dense block data (flattened column-major, `sK *
/// nrhs` entries) for broadcasts, or the partial `lsum` contribution for
/// reduces.
#[derive(Debug, Clone)]
pub struct Message<E> {
    pub header: usize,
    pub values: Vec<E>,
}

impl<E> Message<E> {
    pub fn new(header: usize, values: Vec<E>) -> Self {
        Self { header, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

//! Per-rank view of the tree registry (spec §2 component C, §4.C).
//!
//! Trees are built once by the setup routine from *global* symbolic
//! structure no single rank has on its own (which ranks own an off-diagonal
//! block in a given column is not recoverable from this rank's local L/U
//! factor alone) — [`SolveTrees`] is handed to the engines as read-only
//! input, exactly like [`sptrsv_core::LFactors`]/[`sptrsv_core::UFactors`].

use sptrsv_transport::{BcTree, RdTree};

/// One broadcast tree per local block *column* (`bc`, indexed by `lbj`:
/// broadcast travels within a fixed mesh column) and one reduction tree per
/// local block *row* (`rd`, indexed by `lbi`: reduction folds within a fixed
/// mesh row) — the same indexing for both `L` and `U` (see
/// `crate::lsolve`/`crate::usolve`). `bc` and `rd` are independently sized:
/// `num_local_block_cols`/`num_local_block_rows` only coincide for a square
/// `Pr == Pc` mesh.
#[derive(Debug, Clone)]
pub struct SolveTrees {
    bc: Vec<BcTree>,
    rd: Vec<RdTree>,
}

impl SolveTrees {
    pub fn new(bc: Vec<BcTree>, rd: Vec<RdTree>) -> Self {
        Self { bc, rd }
    }

    pub fn bc(&self, lbj: usize) -> &BcTree {
        &self.bc[lbj]
    }

    pub fn rd(&self, lbi: usize) -> &RdTree {
        &self.rd[lbi]
    }

    pub fn num_bc(&self) -> usize {
        self.bc.len()
    }

    pub fn num_rd(&self) -> usize {
        self.rd.len()
    }
}

use dyn_stack::{SizeOverflow, StackReq};
use faer_core::{ComplexField, Entity};
use std::sync::atomic::AtomicI32;

/// Encodes/decodes the one-word supernode-id header that precedes every
/// block in `x`/`lsum` (spec §3: "each prefixed by a one-word header
/// recording its global supernode id"). Implemented only for the two
/// real-valued scalar types exercised by the seed scenarios in spec §8;
/// none of them drive a complex right-hand side, so `c32`/`c64` headers are
/// intentionally left unimplemented here (see `DESIGN.md`).
pub trait HeaderWord: Sized {
    fn encode_header(id: usize) -> Self;
    fn decode_header(&self) -> usize;
}

impl HeaderWord for f64 {
    fn encode_header(id: usize) -> Self {
        id as f64
    }
    fn decode_header(&self) -> usize {
        *self as usize
    }
}

impl HeaderWord for f32 {
    fn encode_header(id: usize) -> Self {
        id as f32
    }
    fn decode_header(&self) -> usize {
        *self as usize
    }
}

/// Start offset of each local block's *data* (header excluded) within
/// `x`/`lsum`, for `nrhs` right-hand sides (spec §3: `ilsum`). A single
/// header word immediately precedes block `lbk`'s data at
/// `x[ilsum[lbk] - 1]` (Testable Property 4), shared across all `nrhs`
/// columns of that block — the original layout's `XK_H`/`LSUM_H` header
/// words are per block, not per right-hand-side column.
pub fn build_ilsum(local_block_sizes: &[usize], nrhs: usize) -> Vec<usize> {
    let nrhs = nrhs.max(1);
    let mut ilsum = Vec::with_capacity(local_block_sizes.len() + 1);
    let mut offset = 0usize;
    for &sk in local_block_sizes {
        offset += 1; // header word
        ilsum.push(offset);
        offset += sk * nrhs;
    }
    ilsum.push(offset);
    ilsum
}

/// Total length (in `E`-words) of the `x`/`lsum` arrays under the layout
/// `build_ilsum` produces — the offset just past the last block.
pub fn array_len(ilsum: &[usize]) -> usize {
    ilsum.last().copied().unwrap_or(0)
}

/// Scratch budget for the solve's per-process arrays, sized the way every
/// `*_req` function in the teacher's `faer-math` crate is — so a caller
/// driving repeated solves can preallocate one `GlobalMemBuffer` and reuse
/// it across calls via `dyn_stack::DynStack::new`.
pub fn solve_workspace_req<E: Entity>(
    x_len: usize,
    lsum_len: usize,
    num_local_blocks: usize,
) -> Result<StackReq, SizeOverflow> {
    StackReq::try_all_of([
        StackReq::try_new::<E>(x_len)?,
        StackReq::try_new::<E>(lsum_len)?,
        StackReq::try_new::<i32>(num_local_blocks)?, // fmod
        StackReq::try_new::<i32>(num_local_blocks)?, // bmod
    ])
}

/// Per-process solution/partial-sum arrays and dependency counters (spec
/// §3). Allocated at solve entry, released at solve exit — dropping this
/// struct is that release; L/U factors and trees outlive it.
pub struct SolveWorkspace<E: ComplexField> {
    /// Concatenation of locally owned X-blocks, each header-prefixed.
    pub x: Vec<E>,
    /// Same layout, accumulating partial L/U products pending reduction.
    pub lsum: Vec<E>,
    /// Start offset of each local block's data within `x`/`lsum`, length
    /// `num_local_blocks + 1` (the last entry is the total array length).
    pub ilsum: Vec<usize>,
    /// Remaining L-contributions before `X[K]` can be solved.
    pub fmod: Vec<AtomicI32>,
    /// Remaining U-contributions (back-substitution counterpart).
    pub bmod: Vec<AtomicI32>,
    /// Reduce-tree children contributing to each block (forward phase).
    pub frecv: Vec<i32>,
    /// Reduce-tree children contributing to each block (backward phase).
    pub brecv: Vec<i32>,
    pub nrhs: usize,
}

impl<E: ComplexField> SolveWorkspace<E> {
    pub fn new(ilsum: Vec<usize>, nrhs: usize, frecv: Vec<i32>, brecv: Vec<i32>) -> Self {
        let num_local_blocks = ilsum.len().saturating_sub(1);
        assert_eq!(frecv.len(), num_local_blocks);
        assert_eq!(brecv.len(), num_local_blocks);
        let len = array_len(&ilsum);
        Self {
            x: vec![E::zero(); len],
            lsum: vec![E::zero(); len],
            fmod: frecv.iter().map(|&c| AtomicI32::new(c)).collect(),
            bmod: brecv.iter().map(|&c| AtomicI32::new(c)).collect(),
            frecv,
            brecv,
            ilsum,
            nrhs: nrhs.max(1),
        }
    }

    pub fn num_local_blocks(&self) -> usize {
        self.ilsum.len().saturating_sub(1)
    }

    /// Data span `[start, end)` within `x`/`lsum` for local block `lbk`,
    /// header word excluded, `sK * nrhs` entries laid out row-major (row
    /// `i`, rhs column `c` at offset `i * nrhs + c` — Testable Property 8:
    /// "`nrhs>1` ... produce row-major-packed multiple RHS results").
    pub fn block_data_span(&self, lbk: usize) -> (usize, usize) {
        (self.ilsum[lbk], self.ilsum[lbk + 1])
    }

    /// Resets `bmod` back to the initial `brecv` counts — used when one
    /// `solve` call reuses the same workspace for the back substitution
    /// after the forward L-solve has completed.
    pub fn reset_bmod(&self) {
        use std::sync::atomic::Ordering;
        for (slot, &c) in self.bmod.iter().zip(self.brecv.iter()) {
            slot.store(c, Ordering::Release);
        }
    }
}

impl<E: ComplexField + HeaderWord> SolveWorkspace<E> {
    /// Writes the header word (global supernode id `K`) immediately before
    /// local block `lbk`'s data, at `x[ilsum[lbk] - 1]`.
    pub fn set_header(&mut self, lbk: usize, global_k: usize) {
        self.x[self.ilsum[lbk] - 1] = E::encode_header(global_k);
    }

    /// Reads back the header word preceding local block `lbk` (Testable
    /// Property 4).
    pub fn header(&self, lbk: usize) -> usize {
        self.x[self.ilsum[lbk] - 1].decode_header()
    }
}

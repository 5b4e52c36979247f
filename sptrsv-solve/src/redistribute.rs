//! B <-> X redistribution (spec §4.E, component E).
//!
//! Forward packs each locally-owned row of `B` to the diagonal process of
//! its supernode; backward is the mirror, diagonal processes scattering
//! `X` back onto the rank that owns that row in `B`'s distribution. Both
//! directions take a single-process shortcut: no message ever leaves the
//! process, so construct the identity-composed-with-permutation copy
//! directly (Testable Property 3).
//!
//! Argument names spell out the two permutations explicitly as `row_perm`/
//! `col_perm` rather than reusing the spec's own `Pr`/`Pc` notation for
//! them, which would collide with the process-grid `Pr x Pc` mesh
//! dimensions used everywhere else in this crate.

use sptrsv_core::{ComplexField, SolveCommPlan, SolveWorkspace, SupernodeIndex};
use sptrsv_core::error::{fatal, AbortReason};
use sptrsv_core::grid::ProcessGrid;
use sptrsv_transport::{Message, MsgTag, Transport};

use crate::stats::SolveStats;

/// Global row `irow` placed within local block `lbi`'s data span at
/// `block_data_span(lbi).0 + (irow - firstRow(K)) * nrhs`.
fn local_slot(workspace_ilsum_start: usize, first_row: usize, irow: usize, nrhs: usize) -> usize {
    workspace_ilsum_start + (irow - first_row) * nrhs
}

/// Scatters locally-owned rows of `b` (`m_loc` rows of `nrhs` columns each,
/// row-major with stride `ldb`) onto `workspace.x`, landing each row on the
/// diagonal process of its owning supernode.
#[allow(clippy::too_many_arguments)]
pub fn scatter_b_to_x<E, T>(
    transport: &T,
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    row_perm: &[usize],
    col_perm: &[usize],
    comm: &SolveCommPlan,
    b: &[E],
    ldb: usize,
    fst_row: usize,
    m_loc: usize,
    nrhs: usize,
    workspace: &mut SolveWorkspace<E>,
    stats: &SolveStats,
) where
    E: ComplexField,
    T: Transport<E>,
{
    let place = |irow: usize, row: &[E], workspace: &mut SolveWorkspace<E>| {
        let k = supernodes.block_of_row(irow);
        let lbi = supernodes
            .local_block_row(grid, k)
            .unwrap_or_else(|| fatal(AbortReason::HeaderOutOfRange {
                got: k as i64,
                nsupers: supernodes.nsupers(),
            }));
        let (start, _) = workspace.block_data_span(lbi);
        let slot = local_slot(start, supernodes.first_row(k), irow, nrhs);
        // Seeds `lsum`, not `x`: `solve_l`'s diagonal step reads its
        // right-hand side from `lsum` (spec §4.F), reducing it in place as
        // off-diagonal contributions apply before the block is ready.
        workspace.lsum[slot..slot + nrhs].clone_from_slice(&row[..nrhs]);
    };

    if grid.is_single_process() {
        for i in 0..m_loc {
            let global_row = fst_row + i;
            let irow = col_perm[row_perm[global_row]];
            place(irow, &b[i * ldb..i * ldb + nrhs], workspace);
        }
        return;
    }

    for i in 0..m_loc {
        let global_row = fst_row + i;
        let irow = col_perm[row_perm[global_row]];
        let k = supernodes.block_of_row(irow);
        let dest = grid.rank_at(supernodes.row_owner(grid, k), supernodes.col_owner(grid, k));
        let row = &b[i * ldb..i * ldb + nrhs];
        if dest == transport.rank() {
            place(irow, row, workspace);
        } else {
            transport.send(dest, MsgTag::BToX, Message::new(irow, row.to_vec())).wait();
            stats.record_send();
        }
    }

    let expected = comm.recv_counts[transport.rank()] as usize;
    for _ in 0..expected {
        let (tag, msg) = transport.recv_any();
        stats.record_recv();
        debug_assert_eq!(tag, MsgTag::BToX);
        if msg.header >= supernodes.n() {
            fatal(AbortReason::HeaderOutOfRange {
                got: msg.header as i64,
                nsupers: supernodes.nsupers(),
            });
        }
        place(msg.header, &msg.values, workspace);
    }
}

/// Gathers `workspace.x` (now holding the solved `Y`, spec §4.F goal) back
/// into `b`'s distribution, one row at a time, per `comm.row_to_proc`.
#[allow(clippy::too_many_arguments)]
pub fn gather_x_to_b<E, T>(
    transport: &T,
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    comm: &SolveCommPlan,
    workspace: &SolveWorkspace<E>,
    b: &mut [E],
    ldb: usize,
    fst_row: usize,
    m_loc: usize,
    nrhs: usize,
    stats: &SolveStats,
) where
    E: ComplexField,
    T: Transport<E>,
{
    if grid.is_single_process() {
        for lbi in 0..workspace.num_local_blocks() {
            let k = lbi;
            let (start, _) = workspace.block_data_span(lbi);
            let first_row = supernodes.first_row(k);
            for r in 0..supernodes.size(k) {
                let global_row = first_row + r;
                let slot = start + r * nrhs;
                let i = global_row - fst_row;
                b[i * ldb..i * ldb + nrhs].clone_from_slice(&workspace.x[slot..slot + nrhs]);
            }
        }
        return;
    }

    // Diagonal processes walk every row of every locally-owned block,
    // routing it to whichever rank owns that row in B's distribution.
    for lbi in 0..workspace.num_local_blocks() {
        let k = supernodes_local_to_global(grid, supernodes, lbi);
        let (start, _) = workspace.block_data_span(lbi);
        let first_row = supernodes.first_row(k);
        for r in 0..supernodes.size(k) {
            let global_row = first_row + r;
            let slot = start + r * nrhs;
            let dest = comm.row_to_proc[global_row] as usize;
            let row = workspace.x[slot..slot + nrhs].to_vec();
            if dest == transport.rank() {
                let i = global_row - fst_row;
                b[i * ldb..i * ldb + nrhs].clone_from_slice(&row);
            } else {
                transport.send(dest, MsgTag::XToB, Message::new(global_row, row)).wait();
                stats.record_send();
            }
        }
    }

    // Unlike the forward scatter (where `comm.recv_counts` is precomputed
    // globally), this rank's own expected backward-gather count is cheap to
    // derive on the spot: exactly the local B-rows whose diagonal owner is
    // some other rank. The diagonal owner is a property of the factor's
    // grid distribution, not of `B`'s own row partition, so it is derived
    // directly here the same way `scatter_b_to_x` derives its `dest`,
    // rather than through `comm.row_to_proc` (which carries the opposite
    // direction's mapping: B-row-owner, not diagonal-owner).
    let expected = (0..m_loc)
        .filter(|&i| {
            let k = supernodes.block_of_row(fst_row + i);
            let diag_owner = grid.rank_at(supernodes.row_owner(grid, k), supernodes.col_owner(grid, k));
            diag_owner != transport.rank()
        })
        .count();
    for _ in 0..expected {
        let (tag, msg) = transport.recv_any();
        stats.record_recv();
        debug_assert_eq!(tag, MsgTag::XToB);
        let i = msg.header - fst_row;
        debug_assert!(i < m_loc);
        b[i * ldb..i * ldb + nrhs].clone_from_slice(&msg.values);
    }
}

fn supernodes_local_to_global(grid: &ProcessGrid, supernodes: &SupernodeIndex, lbi: usize) -> usize {
    // Inverse of `SupernodeIndex::local_block_row`: the `lbi`-th supernode
    // this rank's mesh row owns.
    (0..supernodes.nsupers())
        .filter(|&k| supernodes.row_owner(grid, k) == grid.myrow())
        .nth(lbi)
        .unwrap_or_else(|| fatal(AbortReason::HeaderOutOfRange {
            got: lbi as i64,
            nsupers: supernodes.nsupers(),
        }))
}

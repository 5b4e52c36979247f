//! Builds the per-rank dependency counters and `ilsum` layout the engines
//! need from the L/U factor structure and tree registry — the piece of
//! "setup routine" work (spec §9 "Global mutable counters") that is
//! inseparable from the factor layout itself rather than truly opaque
//! external input like the factors or trees are.
//!
//! `U`'s factor data is stored column-indexed exactly like `L`'s (see
//! [`sptrsv_core::UFactors`]) and its solve walks the same dependency
//! shape: the per-rank accumulator for a row's equation lives wherever
//! that row is row-owned (`lbi`), fed by column-indexed off-diagonal
//! blocks the same way `L`'s is. Every builder below is accordingly a
//! straight mirror of its `L` counterpart, not a row/column transpose of
//! it.

use sptrsv_core::error::{fatal, AbortReason};
use sptrsv_core::grid::ProcessGrid;
use sptrsv_core::workspace::{array_len, build_ilsum, solve_workspace_req, HeaderWord};
use sptrsv_core::{
    ComplexField, DiagInvCache, GlobalBlockPattern, LFactors, SolveWorkspace, SupernodeIndex, UFactors,
};
use sptrsv_transport::{flat_bc_tree, flat_rd_tree, BcTree, RdTree};

use crate::trees::SolveTrees;

/// Sizes of this rank's row-owned local blocks, indexed by `lbi` — the
/// layout both `L`'s and `U`'s workspaces are built over.
pub fn row_owned_block_sizes(grid: &ProcessGrid, supernodes: &SupernodeIndex) -> Vec<usize> {
    (0..supernodes.nsupers())
        .filter(|&k| supernodes.row_owner(grid, k) == grid.myrow())
        .map(|k| supernodes.size(k))
        .collect()
}

/// Per-`lbi` count of distinct local L columns holding an off-diagonal
/// block targeting that row (spec §4.F step 2: "decrement fmod[lbi(I)] by
/// the number of block-products just applied"). This is the *local*
/// component of the initial `fmod`; reduce-tree children (`frecv`) are
/// folded in by the caller.
pub fn l_block_contrib_counts<E: ComplexField>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    lfactors: &LFactors<E>,
) -> Vec<i32> {
    let mut counts = vec![0i32; supernodes.num_local_block_rows(grid)];
    for column in lfactors.columns() {
        for block in &column.blocks {
            if let Some(lbi) = supernodes.local_block_row(grid, block.global_row) {
                counts[lbi] += 1;
            }
        }
    }
    counts
}

/// Mirror of [`l_block_contrib_counts`] for `U`: per-`lbi` count of
/// distinct local U columns holding an off-diagonal block targeting that
/// row (`U(I, J)` with `I < J`, stored in column `J`'s block list).
pub fn u_block_contrib_counts<E: ComplexField>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    ufactors: &UFactors<E>,
) -> Vec<i32> {
    let mut counts = vec![0i32; supernodes.num_local_block_rows(grid)];
    for column in ufactors.columns() {
        for block in &column.blocks {
            if let Some(lbi) = supernodes.local_block_row(grid, block.global_row) {
                counts[lbi] += 1;
            }
        }
    }
    counts
}

/// `frecv`/`brecv`: reduce-tree children per local block, read straight off
/// the tree registry (spec §3).
pub fn recv_counts_from_trees(trees: &[RdTree]) -> Vec<i32> {
    trees.iter().map(|t| t.num_children() as i32).collect()
}

/// Builds every rank's broadcast (`bc`, indexed by `lbj`) and reduction
/// (`rd`, indexed by `lbi`) tree for `L` from the replicated global block
/// pattern (spec §2 component C): no rank's own local [`LFactors`] says who
/// *else* holds an off-diagonal block in a given column, so this has to
/// start from the cross-rank-replicated structure every process receives
/// from symbolic factorization, the same way SuperLU_DIST builds `LBtree`
/// from its replicated `Glu_persist` subscripts with no further
/// communication once every process also knows the grid.
pub fn build_l_trees(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    pattern: &GlobalBlockPattern,
    msg_size: usize,
) -> SolveTrees {
    build_trees(grid, supernodes, &pattern.l_columns, msg_size)
}

/// Mirror of [`build_l_trees`] for `U`.
pub fn build_u_trees(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    pattern: &GlobalBlockPattern,
    msg_size: usize,
) -> SolveTrees {
    build_trees(grid, supernodes, &pattern.u_columns, msg_size)
}

fn build_trees(grid: &ProcessGrid, supernodes: &SupernodeIndex, columns: &[Vec<usize>], msg_size: usize) -> SolveTrees {
    let nsupers = supernodes.nsupers();
    let by_row = invert_pattern(columns, nsupers);
    let my_rank = grid.rank();

    let bc = (0..supernodes.num_local_block_cols(grid))
        .map(|lbj| {
            let k = global_id_of_local_column(grid, supernodes, lbj);
            build_bc_tree(grid, k, &columns[k], my_rank, msg_size)
        })
        .collect();

    let rd = (0..supernodes.num_local_block_rows(grid))
        .map(|lbi| {
            let i = global_id_of_local_row(grid, supernodes, lbi);
            build_rd_tree(grid, i, &by_row[i], my_rank, msg_size)
        })
        .collect();

    SolveTrees::new(bc, rd)
}

/// `by_row[i]` — global column ids `k` whose pattern lists `i` as an
/// off-diagonal block row, the transpose view [`build_trees`]'s reduction
/// side needs (which mesh columns fold into row `i`, rather than which rows
/// a given column broadcasts to).
fn invert_pattern(columns: &[Vec<usize>], nsupers: usize) -> Vec<Vec<usize>> {
    let mut by_row = vec![Vec::new(); nsupers];
    for (k, rows) in columns.iter().enumerate() {
        for &i in rows {
            by_row[i].push(k);
        }
    }
    by_row
}

/// One column's broadcast tree: root is `k`'s diagonal process, participants
/// are every mesh row (within `k`'s owning mesh column) holding an
/// off-diagonal consumer of `X[K]`.
fn build_bc_tree(grid: &ProcessGrid, k: usize, consumer_rows: &[usize], my_rank: usize, msg_size: usize) -> BcTree {
    let mesh_col = grid.col_owner(k);
    let root_row = grid.row_owner(k);
    let root = grid.rank_at(root_row, mesh_col);

    let mut rows: Vec<usize> = consumer_rows.iter().map(|&i| grid.row_owner(i)).collect();
    rows.sort_unstable();
    rows.dedup();
    rows.retain(|&r| r != root_row);
    if rows.is_empty() {
        return BcTree::trivial(root, msg_size);
    }

    let mut participants: Vec<usize> = rows.iter().map(|&r| grid.rank_at(r, mesh_col)).collect();
    participants.push(root);
    flat_bc_tree(root, &participants, my_rank, msg_size)
}

/// One row's reduction tree: root is `i`'s diagonal process, participants
/// are every mesh column (within `i`'s owning mesh row) holding an
/// off-diagonal block that contributes to `lsum[I]`.
fn build_rd_tree(grid: &ProcessGrid, i: usize, contributing_columns: &[usize], my_rank: usize, msg_size: usize) -> RdTree {
    let mesh_row = grid.row_owner(i);
    let root_col = grid.col_owner(i);
    let root = grid.rank_at(mesh_row, root_col);

    let mut cols: Vec<usize> = contributing_columns.iter().map(|&k| grid.col_owner(k)).collect();
    cols.sort_unstable();
    cols.dedup();
    cols.retain(|&c| c != root_col);
    if cols.is_empty() {
        return RdTree::trivial(root, msg_size);
    }

    let mut participants: Vec<usize> = cols.iter().map(|&c| grid.rank_at(mesh_row, c)).collect();
    participants.push(root);
    flat_rd_tree(root, &participants, my_rank, msg_size)
}

/// The `lbj`-th supernode this rank column-owns, in increasing global-id
/// order — the inverse of [`SupernodeIndex::local_block_col`].
pub fn global_id_of_local_column(grid: &ProcessGrid, supernodes: &SupernodeIndex, lbj: usize) -> usize {
    (0..supernodes.nsupers())
        .filter(|&k| supernodes.col_owner(grid, k) == grid.mycol())
        .nth(lbj)
        .expect("lbj enumerated from a local-column count must resolve")
}

/// The `lbi`-th supernode this rank row-owns — the inverse of
/// [`SupernodeIndex::local_block_row`].
pub fn global_id_of_local_row(grid: &ProcessGrid, supernodes: &SupernodeIndex, lbi: usize) -> usize {
    (0..supernodes.nsupers())
        .filter(|&k| supernodes.row_owner(grid, k) == grid.myrow())
        .nth(lbi)
        .expect("lbi enumerated from a local-row count must resolve")
}

/// Messages the `L`-solve receive loop must consume before exiting:
/// broadcasts for every local column this rank is *not* the diagonal
/// process for but does hold at least one off-diagonal block in (a
/// non-participant gets no broadcast at all — its column's tree never
/// lists it), plus every reduce-tree message a locally-owned root expects
/// (spec §4.F "Message counters", §8 Property 2).
pub fn expected_l_messages<E: ComplexField>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    lfactors: &LFactors<E>,
    rd_trees: &[RdTree],
) -> usize {
    let nfrecvx = (0..lfactors.num_local_columns())
        .filter(|&lbj| {
            !supernodes.is_diagonal_process(grid, global_id_of_local_column(grid, supernodes, lbj))
                && !lfactors.column(lbj).blocks.is_empty()
        })
        .count();
    let nfrecvmod: i32 = recv_counts_from_trees(rd_trees).iter().sum();
    nfrecvx + nfrecvmod as usize
}

/// Mirror of [`expected_l_messages`] for `U`.
pub fn expected_u_messages<E: ComplexField>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    ufactors: &UFactors<E>,
    rd_trees: &[RdTree],
) -> usize {
    let nbrecvx = (0..ufactors.num_local_columns())
        .filter(|&lbj| {
            !supernodes.is_diagonal_process(grid, global_id_of_local_column(grid, supernodes, lbj))
                && !ufactors.column(lbj).blocks.is_empty()
        })
        .count();
    let nbrecvmod: i32 = recv_counts_from_trees(rd_trees).iter().sum();
    nbrecvx + nbrecvmod as usize
}

/// Assembles the `L`-solve workspace: `ilsum` over row-owned blocks, and
/// `fmod` initialized to local block contributions plus reduce-tree
/// children (spec §4.F "Initial frontier": `fmod[k] += frecv[k]`).
pub fn build_l_workspace<E: ComplexField + HeaderWord>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    lfactors: &LFactors<E>,
    rd_trees: &[RdTree],
    nrhs: usize,
) -> SolveWorkspace<E> {
    let sizes = row_owned_block_sizes(grid, supernodes);
    let ilsum = build_ilsum(&sizes, nrhs);
    check_workspace_size(&ilsum, sizes.len(), "L-solve workspace");
    let frecv = recv_counts_from_trees(rd_trees);
    let contrib = l_block_contrib_counts(grid, supernodes, lfactors);
    let fmod_init: Vec<i32> = contrib.iter().zip(frecv.iter()).map(|(c, f)| c + f).collect();
    let mut workspace = SolveWorkspace::new(ilsum, nrhs, fmod_init, vec![0; sizes.len()]);
    stamp_headers(grid, supernodes, &mut workspace);
    workspace
}

/// Mirror of [`build_l_workspace`] for `U` — laid out over the *same*
/// row-owned blocks `L`'s workspace uses (back substitution's per-row
/// accumulator lives at the same rank `L`'s does), keyed by `bmod`
/// instead of `fmod`.
pub fn build_u_workspace<E: ComplexField + HeaderWord>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    ufactors: &UFactors<E>,
    rd_trees: &[RdTree],
    nrhs: usize,
) -> SolveWorkspace<E> {
    let sizes = row_owned_block_sizes(grid, supernodes);
    let ilsum = build_ilsum(&sizes, nrhs);
    check_workspace_size(&ilsum, sizes.len(), "U-solve workspace");
    let brecv = recv_counts_from_trees(rd_trees);
    let contrib = u_block_contrib_counts(grid, supernodes, ufactors);
    let bmod_init: Vec<i32> = contrib.iter().zip(brecv.iter()).map(|(c, f)| c + f).collect();
    // `SolveWorkspace::new`'s third/fourth positions seed `fmod`/`bmod`
    // respectively; this workspace instance only ever drives `usolve`'s
    // `bmod` counters, so the `fmod` slot gets an unused all-zero vector.
    let mut workspace = SolveWorkspace::new(ilsum, nrhs, vec![0; sizes.len()], bmod_init);
    stamp_headers(grid, supernodes, &mut workspace);
    workspace
}

/// Sizes the scratch request the way every `*_req` fn in the teacher's
/// `faer-math` crate does (spec §9), aborting rather than letting a later
/// allocation panic opaquely if `x`/`lsum`'s combined size overflows.
fn check_workspace_size<E: ComplexField>(ilsum: &[usize], num_local_blocks: usize, what: &'static str) {
    let len = array_len(ilsum);
    if solve_workspace_req::<E>(len, len, num_local_blocks).is_err() {
        fatal(AbortReason::Allocation { what });
    }
}

/// Stamps each row-owned local block's header word with its own global
/// supernode id, so the hot path can assert an incoming/forwarded block
/// actually lands where the workspace was built to expect it.
fn stamp_headers<E: ComplexField + HeaderWord>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    workspace: &mut SolveWorkspace<E>,
) {
    for lbi in 0..workspace.num_local_blocks() {
        let k = global_id_of_local_row(grid, supernodes, lbi);
        workspace.set_header(lbi, k);
    }
}

/// Builds [`DiagInvCache`] for `L`, indexed by `lbi` to match
/// [`crate::lsolve::LSolveCtx::diaginv`] — populated only at entries this
/// rank is the diagonal process for, `None` elsewhere.
pub fn build_l_diag_inverses<E: ComplexField>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    lfactors: &LFactors<E>,
) -> DiagInvCache<E> {
    let mut cache = DiagInvCache::empty(supernodes.num_local_block_rows(grid));
    let local_cols: Vec<usize> = (0..supernodes.nsupers())
        .filter(|&k| supernodes.col_owner(grid, k) == grid.mycol())
        .collect();
    for (lbj, &k) in local_cols.iter().enumerate() {
        let Some(diag) = lfactors.column(lbj).diag.as_ref() else {
            continue;
        };
        let lbi = supernodes
            .local_block_row(grid, k)
            .expect("a diagonal column's k is also row-owned here");
        cache.set_unit_lower_inverse(lbi, diag.as_ref());
    }
    cache
}

/// Mirror of [`build_l_diag_inverses`] for `U`, also indexed by `lbi` to
/// match [`crate::usolve::USolveCtx::diaginv`].
pub fn build_u_diag_inverses<E: ComplexField>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    ufactors: &UFactors<E>,
) -> DiagInvCache<E> {
    let mut cache = DiagInvCache::empty(supernodes.num_local_block_rows(grid));
    let local_cols: Vec<usize> = (0..supernodes.nsupers())
        .filter(|&k| supernodes.col_owner(grid, k) == grid.mycol())
        .collect();
    for (lbj, &k) in local_cols.iter().enumerate() {
        let Some(diag) = ufactors.column(lbj).diag.as_ref() else {
            continue;
        };
        let lbi = supernodes
            .local_block_row(grid, k)
            .expect("a diagonal column's k is also row-owned here");
        cache.set_upper_inverse(lbi, diag.as_ref());
    }
    cache
}

/// Copies the forward solve's result `Y` (held in the `L`-workspace's `x`)
/// into the `U`-workspace's `lsum` ahead of back substitution —
/// `usolve`'s diagonal step reads its right-hand side from `lsum`,
/// mirroring `lsolve`'s own `x`/`lsum` split. Both workspaces share the
/// same row-owned `lbi` layout, so the copy needs no index translation.
/// Only diagonal processes hold meaningful entries in either array —
/// `U*X = Y` only needs `Y` at the diagonal blocks `L*Y=B` solved.
pub fn seed_u_from_l<E: ComplexField>(
    grid: &ProcessGrid,
    supernodes: &SupernodeIndex,
    l_workspace: &SolveWorkspace<E>,
    u_workspace: &mut SolveWorkspace<E>,
) {
    for k in 0..supernodes.nsupers() {
        if !supernodes.is_diagonal_process(grid, k) {
            continue;
        }
        let lbi = supernodes.local_block_row(grid, k).expect("diagonal process row-owns k");
        let (l_start, l_end) = l_workspace.block_data_span(lbi);
        let (u_start, _) = u_workspace.block_data_span(lbi);
        u_workspace.lsum[u_start..u_start + (l_end - l_start)]
            .clone_from_slice(&l_workspace.x[l_start..l_end]);
    }
}

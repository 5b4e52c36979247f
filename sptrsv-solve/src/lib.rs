//! Distributed forward/back triangular solve: redistributes a right-hand
//! side onto the diagonal processes of a factored, distributed `L*U`,
//! solves it in place via two dependency-driven passes, and gathers the
//! result back onto `B`'s original distribution.
//!
//! `L`/`U` factorization, symbolic analysis, equilibration, and process-
//! grid/permutation construction are external collaborators (spec §1) —
//! this crate consumes their output through [`sptrsv_core`] and
//! [`sptrsv_transport`].

pub mod config;
pub mod redistribute;
pub mod setup;
pub mod stats;
pub mod trees;

pub mod lsolve;
pub mod usolve;

use sptrsv_core::error::SolveError;
use sptrsv_core::grid::ProcessGrid;
use sptrsv_core::workspace::HeaderWord;
use sptrsv_core::{ComplexField, DiagInvCache, LFactors, Parallelism, SolveCommPlan, SupernodeIndex, UFactors};
use sptrsv_transport::Transport;

pub use config::{SolveConfig, TransportKind};
pub use stats::SolveStats;
pub use trees::SolveTrees;

/// The distributed `L*U` factor bundle (spec §6 "LU factor bundle").
pub struct Factors<'a, E: ComplexField> {
    pub l: &'a LFactors<E>,
    pub u: &'a UFactors<E>,
}

/// Row and column permutations applied ahead of factorization (spec §6
/// "scale/permutation bundle", §4.E). Kept as two explicit fields rather
/// than the spec's own overloaded `Pr`/`Pc` notation, which would collide
/// with the process-grid `Pr x Pc` mesh dimensions.
pub struct Permutations<'a> {
    pub row_perm: &'a [usize],
    pub col_perm: &'a [usize],
}

/// Broadcast/reduction trees for both factors (spec §2 component C). Both
/// `l` and `u` use the same orientation — `bc` indexed by `lbj` (broadcast
/// travels within a fixed mesh column), `rd` indexed by `lbi` (reduction
/// folds within a fixed mesh row) — since both triangular solves share the
/// same 2D block-cyclic ownership rule, just walking the dependency DAG in
/// opposite directions.
pub struct TreeBundle<'a> {
    pub l: &'a SolveTrees,
    pub u: &'a SolveTrees,
}

/// Solves `A*X = B` given a previously computed, distributed `L*U` and
/// returns `info` (spec §6 "Return / error codes"): `0` on success, `-k`
/// if the `k`-th argument failed validation. On success `b` is overwritten
/// with `X`.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip_all, fields(n, nrhs, rank = grid.rank()))]
pub fn solve<E, T>(
    // Matrix order; a signed, C-callable `info=-k`-style argument (mirrors
    // `pdgstrs`'s own signature) so a negative value is itself the caller
    // error `SolveError::InvalidOrder` reports, rather than an unrepresentable
    // `usize`. This layer otherwise derives everything it needs from
    // `supernodes` instead (n = `supernodes.n()`).
    n: i64,
    supernodes: &SupernodeIndex,
    factors: &Factors<'_, E>,
    perms: &Permutations<'_>,
    grid: &ProcessGrid,
    b: &mut [E],
    m_loc: usize,
    fst_row: usize,
    ldb: usize,
    nrhs: i64,
    comm: &SolveCommPlan,
    trees: &TreeBundle<'_>,
    transport: &T,
    config: &SolveConfig,
    stats: &SolveStats,
) -> i32
where
    E: ComplexField + HeaderWord,
    T: Transport<E>,
{
    if let Err(e) = validate_args(n, nrhs, ldb, m_loc) {
        tracing::warn!(error = %e, "argument validation failed");
        return e.info_code();
    }
    let nrhs = nrhs as usize;

    let mut l_workspace =
        setup::build_l_workspace(grid, supernodes, factors.l, &l_rd_trees(trees), nrhs);
    let mut u_workspace =
        setup::build_u_workspace(grid, supernodes, factors.u, &u_rd_trees(trees), nrhs);

    let l_diaginv = if config.use_inverse_diagonals {
        setup::build_l_diag_inverses(grid, supernodes, factors.l)
    } else {
        DiagInvCache::empty(supernodes.num_local_block_rows(grid))
    };
    let u_diaginv = if config.use_inverse_diagonals {
        setup::build_u_diag_inverses(grid, supernodes, factors.u)
    } else {
        DiagInvCache::empty(supernodes.num_local_block_rows(grid))
    };

    tracing::info_span!("scatter").in_scope(|| {
        redistribute::scatter_b_to_x(
            transport,
            grid,
            supernodes,
            perms.row_perm,
            perms.col_perm,
            comm,
            b,
            ldb,
            fst_row,
            m_loc,
            nrhs,
            &mut l_workspace,
            stats,
        );
    });

    let parallelism = if config.num_threads <= 1 {
        Parallelism::None
    } else {
        Parallelism::Rayon(config.num_threads)
    };

    let l_ctx = lsolve::LSolveCtx {
        grid,
        supernodes,
        lfactors: factors.l,
        diaginv: &l_diaginv,
        use_inverse_diagonals: config.use_inverse_diagonals,
        trees: trees.l,
        transport,
        stats,
        parallelism,
        expected_messages: setup::expected_l_messages(grid, supernodes, factors.l, &l_rd_trees(trees)),
    };
    tracing::info_span!("l_solve").in_scope(|| lsolve::solve_l(&l_ctx, &mut l_workspace));

    setup::seed_u_from_l(grid, supernodes, &l_workspace, &mut u_workspace);

    let u_ctx = usolve::USolveCtx {
        grid,
        supernodes,
        ufactors: factors.u,
        diaginv: &u_diaginv,
        use_inverse_diagonals: config.use_inverse_diagonals,
        trees: trees.u,
        transport,
        stats,
        parallelism,
        expected_messages: setup::expected_u_messages(grid, supernodes, factors.u, &u_rd_trees(trees)),
    };
    tracing::info_span!("u_solve").in_scope(|| usolve::solve_u(&u_ctx, &mut u_workspace));

    tracing::info_span!("gather").in_scope(|| {
        redistribute::gather_x_to_b(
            transport, grid, supernodes, comm, &u_workspace, b, ldb, fst_row, m_loc, nrhs, stats,
        );
    });

    0
}

/// Argument validation (spec §6 "Return / error codes"): `n`/`nrhs` arrive
/// signed, so a caller passing a negative matrix order or right-hand-side
/// count is reported the same way `pdgstrs`'s own `info` convention would
/// (`-1`/`-9`), rather than panicking on an unrepresentable `usize` cast.
fn validate_args(n: i64, nrhs: i64, ldb: usize, m_loc: usize) -> Result<(), SolveError> {
    if n < 0 {
        return Err(SolveError::InvalidOrder(n));
    }
    if nrhs < 0 {
        return Err(SolveError::InvalidNrhs(nrhs));
    }
    if ldb < m_loc {
        return Err(SolveError::InvalidLdb { ldb, m_loc });
    }
    Ok(())
}

/// Extracts `trees.l`'s reduce trees as a plain slice, matching the
/// `&[RdTree]` shape [`setup`]'s builders take — `SolveTrees` itself
/// stores `bc`/`rd` as a matched pair rather than exposing the raw slice.
fn l_rd_trees(trees: &TreeBundle<'_>) -> Vec<sptrsv_transport::RdTree> {
    (0..trees.l.num_rd()).map(|i| trees.l.rd(i).clone()).collect()
}

fn u_rd_trees(trees: &TreeBundle<'_>) -> Vec<sptrsv_transport::RdTree> {
    (0..trees.u.num_rd()).map(|i| trees.u.rd(i).clone()).collect()
}

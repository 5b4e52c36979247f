//! Dependency-driven back substitution (spec §4.G): structurally the same
//! engine as [`crate::lsolve`] — same broadcast-along-`lbj`,
//! reduce-along-`lbi` topology, same `ilsum`-indexed workspace — walking
//! the opposite triangular pattern (`U(I, J)` with `I < J`, stored per
//! column same as `L`) in the opposite processing order: the roots of the
//! dependency DAG are the largest-numbered supernodes, not the smallest.

use std::sync::atomic::Ordering;

use sptrsv_core::dense::{apply_inverse_diagonal, gemm_sub, solve_upper_diagonal};
use sptrsv_core::error::{fatal, AbortReason};
use sptrsv_core::grid::ProcessGrid;
use sptrsv_core::workspace::HeaderWord;
use sptrsv_core::{ComplexField, DiagInvCache, Mat, MatRef, Parallelism, SolveWorkspace, SupernodeIndex, UFactors};
use sptrsv_transport::{forward_broadcast, forward_reduce, Message, MsgTag, Transport};

use crate::setup::global_id_of_local_column;
use crate::stats::SolveStats;
use crate::trees::SolveTrees;

pub struct USolveCtx<'a, E: ComplexField, T: Transport<E>> {
    pub grid: &'a ProcessGrid,
    pub supernodes: &'a SupernodeIndex,
    pub ufactors: &'a UFactors<E>,
    /// Indexed by `lbi`, matching `LSolveCtx::diaginv`'s indexing exactly.
    pub diaginv: &'a DiagInvCache<E>,
    pub use_inverse_diagonals: bool,
    /// Broadcast trees indexed by `lbj`, reduction trees indexed by `lbi`
    /// — the same orientation `LSolveCtx::trees` uses.
    pub trees: &'a SolveTrees,
    pub transport: &'a T,
    pub stats: &'a SolveStats,
    pub parallelism: Parallelism,
    pub expected_messages: usize,
}

pub fn solve_u<E, T>(ctx: &USolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>)
where
    E: ComplexField + HeaderWord,
    T: Transport<E>,
{
    // Initial frontier: diagonal local block columns whose bmod already
    // reads zero solve first (spec §4.G mirrors §4.F's "Initial frontier").
    let mut frontier: Vec<usize> = (0..ctx.ufactors.num_local_columns())
        .filter_map(|lbj: usize| {
            let k = global_id_of_local_column(ctx.grid, ctx.supernodes, lbj);
            ctx.supernodes.is_diagonal_process(ctx.grid, k).then_some(())?;
            let lbi = ctx.supernodes.local_block_row(ctx.grid, k)?;
            (workspace.bmod[lbi].load(Ordering::Acquire) == 0).then_some(k)
        })
        .collect();
    frontier.sort_by_key(|&k| std::cmp::Reverse(ctx.trees.bc(lbj_of(ctx, k)).dest_count()));

    for k in frontier {
        solve_and_broadcast(ctx, workspace, k);
    }

    let mut received = 0usize;
    while received < ctx.expected_messages {
        let (tag, msg) = ctx.transport.recv_any();
        ctx.stats.record_recv();
        received += 1;
        match tag {
            MsgTag::UBroadcast => apply_incoming_broadcast(ctx, workspace, msg),
            MsgTag::UReduce => apply_incoming_reduce(ctx, workspace, msg),
            other => fatal(AbortReason::MessageBudgetExceeded {
                counter: tag_name(other),
                expected: ctx.expected_messages,
            }),
        }
    }
}

fn tag_name(tag: MsgTag) -> &'static str {
    match tag {
        MsgTag::UBroadcast => "UBroadcast (unexpected during U-solve wait)",
        MsgTag::UReduce => "UReduce (unexpected during U-solve wait)",
        MsgTag::LBroadcast => "LBroadcast received during U-solve",
        MsgTag::LReduce => "LReduce received during U-solve",
        MsgTag::BToX => "BToX received during U-solve",
        MsgTag::XToB => "XToB received during U-solve",
    }
}

/// Diagonal process for `k` solves `X[K]` and broadcasts it down `k`'s
/// column tree — the mirror of `lsolve::solve_and_broadcast`.
fn solve_and_broadcast<E, T>(ctx: &USolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>, k: usize)
where
    E: ComplexField + HeaderWord,
    T: Transport<E>,
{
    let lbi = ctx
        .supernodes
        .local_block_row(ctx.grid, k)
        .expect("diagonal process always owns its own block row");
    let lbj = lbj_of(ctx, k);
    let nrhs = workspace.nrhs;
    let sk = ctx.supernodes.size(k);
    let (start, end) = workspace.block_data_span(lbi);

    // Mirrors `lsolve::solve_and_broadcast`: the right-hand side lives in
    // `lsum` (seeded from `L`'s solved `Y` by `seed_u_from_l`, then reduced
    // in place by every applied off-diagonal block); `x` receives the
    // solved value produced below.
    let mut solved = Mat::<E>::zeros(sk, nrhs);
    {
        let rhs_slice = &workspace.lsum[start..end];
        for r in 0..sk {
            for c in 0..nrhs {
                solved.write(r, c, rhs_slice[r * nrhs + c].clone());
            }
        }
    }

    if ctx.use_inverse_diagonals {
        if let Some(inv) = ctx.diaginv.get(lbi) {
            let mut out = Mat::<E>::zeros(sk, nrhs);
            apply_inverse_diagonal(out.as_mut(), inv, solved.as_ref(), ctx.parallelism);
            solved = out;
            ctx.stats.record_gemm();
        }
    } else {
        let column = ctx.ufactors.column(lbj);
        let diag = column.diag.as_ref().expect("diagonal column must carry U(K,K)");
        solve_upper_diagonal(diag.as_ref(), solved.as_mut(), ctx.parallelism);
        ctx.stats.record_trsm();
    }

    for r in 0..sk {
        for c in 0..nrhs {
            workspace.x[start + r * nrhs + c] = solved.read(r, c);
        }
    }
    ctx.stats.record_block_solved();

    let mut payload = Vec::with_capacity(sk * nrhs);
    for r in 0..sk {
        for c in 0..nrhs {
            payload.push(solved.read(r, c));
        }
    }
    let tree = ctx.trees.bc(lbj);
    let msg = Message::new(k, payload);
    forward_broadcast(ctx.transport, tree, MsgTag::UBroadcast, &msg);
    for _ in tree.children() {
        ctx.stats.record_send();
    }

    // Mirrors `lsolve::solve_and_broadcast`: this rank may itself row-own
    // off-diagonal blocks in its own column (always true on a
    // single-process grid), and nothing ever forwards a broadcast to
    // ourselves.
    let ready = apply_column_to_local_rows(ctx, workspace, k, solved.as_ref());
    for i in ready {
        fold_and_forward(ctx, workspace, i);
    }
}

/// `lsum[I] -= U(I,K) * X[K]` for every local block with `I < K` in column
/// `K`, mirroring `lsolve::apply_column_to_local_rows` exactly (U's
/// off-diagonal blocks are stored the same column-indexed way L's are).
/// Returns the rows whose `bmod` just reached zero.
fn apply_column_to_local_rows<E, T>(
    ctx: &USolveCtx<'_, E, T>,
    workspace: &mut SolveWorkspace<E>,
    k: usize,
    xk: MatRef<'_, E>,
) -> Vec<usize>
where
    E: ComplexField + HeaderWord,
    T: Transport<E>,
{
    let nrhs = workspace.nrhs;
    let Some(lbj) = ctx.supernodes.local_block_col(ctx.grid, k) else {
        return Vec::new();
    };
    let column = ctx.ufactors.column(lbj);

    let mut ready = Vec::new();
    for block in &column.blocks {
        let i = block.global_row;
        let Some(lbi) = ctx.supernodes.local_block_row(ctx.grid, i) else {
            continue;
        };
        debug_assert_eq!(workspace.header(lbi), i, "local block lbi={lbi} stamped for global row {} but applying row {i}", workspace.header(lbi));
        let (start, _) = workspace.block_data_span(lbi);
        let si = ctx.supernodes.size(i);
        let mut dst = Mat::<E>::zeros(si, nrhs);
        for r in 0..si {
            for c in 0..nrhs {
                dst.write(r, c, workspace.lsum[start + r * nrhs + c].clone());
            }
        }
        gemm_sub(dst.as_mut(), block.as_ref(), xk, ctx.parallelism);
        ctx.stats.record_gemm();
        for r in 0..si {
            for c in 0..nrhs {
                workspace.lsum[start + r * nrhs + c] = dst.read(r, c);
            }
        }
        if workspace.bmod[lbi].fetch_sub(1, Ordering::AcqRel) == 1 {
            ready.push(i);
        }
    }
    ready
}

/// An incoming `X[K]` broadcast from another rank: unpack it and apply it
/// the same way [`solve_and_broadcast`] applies its own freshly solved
/// `X[K]` to locally row-owned blocks.
fn apply_incoming_broadcast<E, T>(ctx: &USolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>, msg: Message<E>)
where
    E: ComplexField + HeaderWord,
    T: Transport<E>,
{
    let k = msg.header;
    if k >= ctx.supernodes.nsupers() {
        fatal(AbortReason::HeaderOutOfRange {
            got: k as i64,
            nsupers: ctx.supernodes.nsupers(),
        });
    }
    let lbj = ctx
        .supernodes
        .local_block_col(ctx.grid, k)
        .expect("a broadcast for k only ever reaches ranks that column-own k");
    let tree = ctx.trees.bc(lbj);
    forward_broadcast(ctx.transport, tree, MsgTag::UBroadcast, &msg);
    for _ in tree.children() {
        ctx.stats.record_send();
    }

    let nrhs = workspace.nrhs;
    let sk = ctx.supernodes.size(k);
    let mut xk = Mat::<E>::zeros(sk, nrhs);
    for r in 0..sk {
        for c in 0..nrhs {
            xk.write(r, c, msg.values[r * nrhs + c].clone());
        }
    }

    let ready = apply_column_to_local_rows(ctx, workspace, k, xk.as_ref());
    for i in ready {
        fold_and_forward(ctx, workspace, i);
    }
}

/// Once `bmod[lbi(I)]` hits zero, fold this rank's local `lsum[I]` up `I`'s
/// reduction tree. At the root (diagonal process for `I`), this is instead
/// the moment to solve `X[I]` — the mirror of `lsolve::fold_and_forward`.
fn fold_and_forward<E, T>(ctx: &USolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>, i: usize)
where
    E: ComplexField + HeaderWord,
    T: Transport<E>,
{
    let lbi = ctx
        .supernodes
        .local_block_row(ctx.grid, i)
        .expect("bmod transitions only fire on a locally row-owned block");

    if ctx.supernodes.is_diagonal_process(ctx.grid, i) {
        solve_and_broadcast(ctx, workspace, i);
        return;
    }

    let tree = ctx.trees.rd(lbi);
    let (start, end) = workspace.block_data_span(lbi);
    let payload = workspace.lsum[start..end].to_vec();
    let has_parent = tree.parent().is_some();
    forward_reduce(ctx.transport, tree, MsgTag::UReduce, Message::new(i, payload));
    if has_parent {
        ctx.stats.record_send();
    }
}

/// Merges a reduce-tree child's partial `lsum[I]` into this rank's own,
/// then (if all children have now reported) folds upward in turn.
fn apply_incoming_reduce<E, T>(ctx: &USolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>, msg: Message<E>)
where
    E: ComplexField + HeaderWord,
    T: Transport<E>,
{
    let i = msg.header;
    if i >= ctx.supernodes.nsupers() {
        fatal(AbortReason::HeaderOutOfRange {
            got: i as i64,
            nsupers: ctx.supernodes.nsupers(),
        });
    }
    let lbi = ctx
        .supernodes
        .local_block_row(ctx.grid, i)
        .unwrap_or_else(|| fatal(AbortReason::HeaderOutOfRange { got: i as i64, nsupers: ctx.supernodes.nsupers() }));
    let (start, end) = workspace.block_data_span(lbi);
    for (slot, incoming) in workspace.lsum[start..end].iter_mut().zip(msg.values.iter()) {
        *slot = slot.add(incoming);
    }
    if workspace.bmod[lbi].fetch_sub(1, Ordering::AcqRel) == 1 {
        fold_and_forward(ctx, workspace, i);
    }
}

fn lbj_of<E: ComplexField, T: Transport<E>>(ctx: &USolveCtx<'_, E, T>, k: usize) -> usize {
    ctx.supernodes
        .local_block_col(ctx.grid, k)
        .expect("diagonal process always owns its own block column")
}

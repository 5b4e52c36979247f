//! Dependency-driven forward substitution (spec §4.F, "the heart").
//!
//! Supernodes are solved as their `fmod` counter reaches zero: first the
//! leaves (diagonal blocks with no outstanding off-diagonal contribution),
//! then, as each leaf's `X[K]` broadcasts down its column tree, every
//! off-diagonal block `(I,K)` this rank owns applies its update to
//! `lsum[I]` and decrements `fmod[lbi(I)]`; when that counter hits zero the
//! (possibly folded) partial sum is solved in turn. The loop's only exit
//! condition is having received exactly `nfrecvx + nfrecvmod` messages —
//! there is no barrier and no global count check (spec §4.F "Message
//! counters").

use std::sync::atomic::Ordering;

use sptrsv_core::dense::{apply_inverse_diagonal, gemm_sub, solve_unit_lower_diagonal};
use sptrsv_core::error::{fatal, AbortReason};
use sptrsv_core::grid::ProcessGrid;
use sptrsv_core::workspace::HeaderWord;
use sptrsv_core::{ComplexField, DiagInvCache, LFactors, Mat, MatRef, Parallelism, SolveWorkspace, SupernodeIndex};
use sptrsv_transport::{forward_broadcast, forward_reduce, Message, MsgTag, Transport};

use crate::setup::global_id_of_local_column;
use crate::stats::SolveStats;
use crate::trees::SolveTrees;

/// Everything the L-solve loop needs, gathered in one place so `solve_l`'s
/// signature does not sprawl across a dozen positional arguments.
pub struct LSolveCtx<'a, E: ComplexField, T: Transport<E>> {
    pub grid: &'a ProcessGrid,
    pub supernodes: &'a SupernodeIndex,
    pub lfactors: &'a LFactors<E>,
    pub diaginv: &'a DiagInvCache<E>,
    pub use_inverse_diagonals: bool,
    pub trees: &'a SolveTrees,
    pub transport: &'a T,
    pub stats: &'a SolveStats,
    pub parallelism: Parallelism,
    /// `nfrecvx + nfrecvmod` for this rank (spec §4.F, §8 Property 2): the
    /// exact number of messages the receive loop consumes before exiting.
    pub expected_messages: usize,
}

/// Runs the forward L-solve to completion on this rank, leaving the solved
/// `Y` in `workspace.x` on every diagonal process.
pub fn solve_l<E, T>(ctx: &LSolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>)
where
    E: ComplexField + HeaderWord,
    T: Transport<E>,
{
    // Initial frontier: diagonal local block columns whose fmod already
    // reads zero solve first, each triggering one broadcast (spec §4.F
    // "Initial frontier"). lbj ranges over locally-owned columns; a column
    // is this rank's diagonal responsibility when it is also locally
    // row-owned at the same global id (diagonal process).
    let mut frontier: Vec<usize> = (0..ctx.lfactors.num_local_columns())
        .filter_map(|lbj: usize| {
            let k = global_id_of_local_column(ctx.grid, ctx.supernodes, lbj);
            ctx.supernodes
                .is_diagonal_process(ctx.grid, k)
                .then_some(())?;
            let lbi = ctx.supernodes.local_block_row(ctx.grid, k)?;
            (workspace.fmod[lbi].load(Ordering::Acquire) == 0).then_some(k)
        })
        .collect();
    // Policy preference, not a correctness requirement (spec §4.F
    // "Tie-breaking"): solve-and-broadcast work with the largest fan-out
    // first, to get bytes on the wire sooner.
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
            MsgTag::LBroadcast => apply_incoming_broadcast(ctx, workspace, msg),
            MsgTag::LReduce => apply_incoming_reduce(ctx, workspace, msg),
            other => fatal(AbortReason::MessageBudgetExceeded {
                counter: tag_name(other),
                expected: ctx.expected_messages,
            }),
        }
    }
}

fn tag_name(tag: MsgTag) -> &'static str {
    match tag {
        MsgTag::LBroadcast => "LBroadcast (unexpected during L-solve wait)",
        MsgTag::LReduce => "LReduce (unexpected during L-solve wait)",
        MsgTag::UBroadcast => "UBroadcast received during L-solve",
        MsgTag::UReduce => "UReduce received during L-solve",
        MsgTag::BToX => "BToX received during L-solve",
        MsgTag::XToB => "XToB received during L-solve",
    }
}

/// Step 1 of spec §4.F: diagonal process for `k` solves `X[K]` and
/// broadcasts it down `k`'s column tree.
fn solve_and_broadcast<E, T>(ctx: &LSolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>, k: usize)
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

    // The right-hand side lives in `lsum`: `scatter_b_to_x` seeds it with
    // `B[K]`, and every applied off-diagonal block since has subtracted
    // its contribution in place (spec §4.F: "lsum[I] -= L(I,K) * X[K]").
    // `x` is reserved for the *solved* value this function produces below.
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
        let column = ctx.lfactors.column(lbj);
        let diag = column.diag.as_ref().expect("diagonal column must carry L(K,K)");
        solve_unit_lower_diagonal(diag.as_ref(), solved.as_mut(), ctx.parallelism);
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
    forward_broadcast(ctx.transport, tree, MsgTag::LBroadcast, &msg);
    for _ in tree.children() {
        ctx.stats.record_send();
    }

    // The diagonal process may also row-own off-diagonal blocks in its own
    // column (always true on a single-process grid; often true in a
    // multi-process one too, since row- and column-ownership are
    // independent mod-Pr/mod-Pc choices). Nothing ever forwards a
    // broadcast to ourselves, so that application has to happen here
    // directly rather than waiting on `apply_incoming_broadcast`.
    let ready = apply_column_to_local_rows(ctx, workspace, k, solved.as_ref());
    for i in ready {
        fold_and_forward(ctx, workspace, i);
    }
}

/// Step 2 of spec §4.F: `xk` (`X[K]`, whether just solved locally or just
/// received from a broadcast) applies to every off-diagonal block `(I,K)`
/// this rank owns, decrementing `fmod[lbi(I)]` once per block applied.
/// Returns the rows whose `fmod` just reached zero.
fn apply_column_to_local_rows<E, T>(
    ctx: &LSolveCtx<'_, E, T>,
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
    let column = ctx.lfactors.column(lbj);

    // Distinct blocks target disjoint `lsum` spans, so this loop has no
    // cross-iteration data hazard; a fuller worker pool would dispatch
    // these concurrently (spec §5), but correctness does not depend on it.
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
        if workspace.fmod[lbi].fetch_sub(1, Ordering::AcqRel) == 1 {
            ready.push(i);
        }
    }
    ready
}

/// An incoming `X[K]` broadcast from another rank: unpack it and apply it
/// the same way [`solve_and_broadcast`] applies its own freshly solved
/// `X[K]` to locally row-owned blocks.
fn apply_incoming_broadcast<E, T>(ctx: &LSolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>, msg: Message<E>)
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
    forward_broadcast(ctx.transport, tree, MsgTag::LBroadcast, &msg);
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

/// Steps 3-4 of spec §4.F: once `fmod[lbi(I)]` hits zero, fold this rank's
/// local `lsum[I]` up `I`'s reduction tree. At the root (diagonal process
/// for `I`), this is instead the moment to solve `X[I]`.
fn fold_and_forward<E, T>(ctx: &LSolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>, i: usize)
where
    E: ComplexField + HeaderWord,
    T: Transport<E>,
{
    let lbi = ctx
        .supernodes
        .local_block_row(ctx.grid, i)
        .expect("fmod transitions only fire on a locally row-owned block");

    if ctx.supernodes.is_diagonal_process(ctx.grid, i) {
        solve_and_broadcast(ctx, workspace, i);
        return;
    }

    let tree = ctx.trees.rd(lbi);
    let (start, end) = workspace.block_data_span(lbi);
    let payload = workspace.lsum[start..end].to_vec();
    let has_parent = tree.parent().is_some();
    forward_reduce(ctx.transport, tree, MsgTag::LReduce, Message::new(i, payload));
    if has_parent {
        ctx.stats.record_send();
    }
}

/// Merges a reduce-tree child's partial `lsum[I]` into this rank's own,
/// then (if all children have now reported) folds upward in turn.
fn apply_incoming_reduce<E, T>(ctx: &LSolveCtx<'_, E, T>, workspace: &mut SolveWorkspace<E>, msg: Message<E>)
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
    if workspace.fmod[lbi].fetch_sub(1, Ordering::AcqRel) == 1 {
        fold_and_forward(ctx, workspace, i);
    }
}

fn lbj_of<E: ComplexField, T: Transport<E>>(ctx: &LSolveCtx<'_, E, T>, k: usize) -> usize {
    ctx.supernodes
        .local_block_col(ctx.grid, k)
        .expect("diagonal process always owns its own block column")
}


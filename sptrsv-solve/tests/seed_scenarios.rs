//! End-to-end seed scenarios driving `sptrsv_solve::solve` against hand-built
//! `L`/`U` factor bundles: a small unit-triangular system through both
//! diagonal-solve paths (S1), an identity-factor system (S3), and a genuine
//! two-rank run over a `2x1` process mesh exercising cross-rank broadcast.

use assert2::assert;
use rand::Rng;

use sptrsv_core::grid::ProcessGrid;
use sptrsv_core::{
    GlobalBlockPattern, LBlock, LColumn, LFactors, Mat, SolveCommPlan, SupernodeIndex, UBlock,
    UColumn, UFactors,
};
use sptrsv_transport::{
    build_one_sided_cluster, build_two_sided_cluster, flat_bc_tree, BcTree, OneSidedTransport, RdTree,
};
use sptrsv_solve::setup::{build_l_trees, build_u_trees};
use sptrsv_solve::{solve, Factors, Permutations, SolveConfig, SolveStats, SolveTrees, TreeBundle};

/// Installs a `tracing` subscriber writing to the test harness's own
/// captured output, so `solve`'s phase spans and `forward_broadcast`/
/// `forward_reduce`'s debug events are visible with `cargo test -- --nocapture`.
/// `try_init` tolerates being called from more than one test in the same
/// process.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn scalar(v: f64) -> Mat<f64> {
    let mut m = Mat::<f64>::zeros(1, 1);
    m.write(0, 0, v);
    m
}

/// The n=4, size-1-supernode system used throughout this module:
/// unit-lower `L` with `L10=2, L20=1, L21=3, L30=1, L31=2, L32=1`, upper `U`
/// with diagonal `2` and every off-diagonal entry `1`. `B = L*U*e` for
/// `e = [1,1,1,1]`, so the solve must recover `X = e`.
fn n4_lfactors_single() -> LFactors<f64> {
    LFactors::new(vec![
        LColumn {
            global_col: 0,
            blocks: vec![
                LBlock { global_row: 1, values: scalar(2.0) },
                LBlock { global_row: 2, values: scalar(1.0) },
                LBlock { global_row: 3, values: scalar(1.0) },
            ],
            diag: Some(scalar(1.0)),
        },
        LColumn {
            global_col: 1,
            blocks: vec![
                LBlock { global_row: 2, values: scalar(3.0) },
                LBlock { global_row: 3, values: scalar(2.0) },
            ],
            diag: Some(scalar(1.0)),
        },
        LColumn {
            global_col: 2,
            blocks: vec![LBlock { global_row: 3, values: scalar(1.0) }],
            diag: Some(scalar(1.0)),
        },
        LColumn { global_col: 3, blocks: vec![], diag: Some(scalar(1.0)) },
    ])
}

fn n4_ufactors_single() -> UFactors<f64> {
    UFactors::new(vec![
        UColumn { global_col: 0, blocks: vec![], diag: Some(scalar(2.0)) },
        UColumn {
            global_col: 1,
            blocks: vec![UBlock { global_row: 0, values: scalar(1.0) }],
            diag: Some(scalar(2.0)),
        },
        UColumn {
            global_col: 2,
            blocks: vec![
                UBlock { global_row: 0, values: scalar(1.0) },
                UBlock { global_row: 1, values: scalar(1.0) },
            ],
            diag: Some(scalar(2.0)),
        },
        UColumn {
            global_col: 3,
            blocks: vec![
                UBlock { global_row: 0, values: scalar(1.0) },
                UBlock { global_row: 1, values: scalar(1.0) },
                UBlock { global_row: 2, values: scalar(1.0) },
            ],
            diag: Some(scalar(2.0)),
        },
    ])
}

fn n4_rhs() -> Vec<f64> {
    vec![5.0, 14.0, 20.0, 18.0]
}

/// The replicated symbolic structure behind the n=4 system above: for each
/// column, the global rows holding an off-diagonal `L`/`U` block, read
/// straight off `n4_lfactors_single`/`n4_ufactors_single`.
fn n4_global_pattern() -> GlobalBlockPattern {
    GlobalBlockPattern::new(
        vec![vec![1, 2, 3], vec![2, 3], vec![3], vec![]],
        vec![vec![], vec![0], vec![0, 1], vec![0, 1, 2]],
    )
}

fn two_rank_n4_lfactors() -> (LFactors<f64>, LFactors<f64>) {
    let rank0 = LFactors::new(vec![
        LColumn { global_col: 0, blocks: vec![LBlock { global_row: 2, values: scalar(1.0) }], diag: Some(scalar(1.0)) },
        LColumn { global_col: 1, blocks: vec![LBlock { global_row: 2, values: scalar(3.0) }], diag: None },
        LColumn { global_col: 2, blocks: vec![], diag: Some(scalar(1.0)) },
        LColumn { global_col: 3, blocks: vec![], diag: None },
    ]);
    let rank1 = LFactors::new(vec![
        LColumn {
            global_col: 0,
            blocks: vec![
                LBlock { global_row: 1, values: scalar(2.0) },
                LBlock { global_row: 3, values: scalar(1.0) },
            ],
            diag: None,
        },
        LColumn { global_col: 1, blocks: vec![LBlock { global_row: 3, values: scalar(2.0) }], diag: Some(scalar(1.0)) },
        LColumn { global_col: 2, blocks: vec![LBlock { global_row: 3, values: scalar(1.0) }], diag: None },
        LColumn { global_col: 3, blocks: vec![], diag: Some(scalar(1.0)) },
    ]);
    (rank0, rank1)
}

fn two_rank_n4_ufactors() -> (UFactors<f64>, UFactors<f64>) {
    let rank0 = UFactors::new(vec![
        UColumn { global_col: 0, blocks: vec![], diag: Some(scalar(2.0)) },
        UColumn { global_col: 1, blocks: vec![UBlock { global_row: 0, values: scalar(1.0) }], diag: None },
        UColumn { global_col: 2, blocks: vec![UBlock { global_row: 0, values: scalar(1.0) }], diag: Some(scalar(2.0)) },
        UColumn {
            global_col: 3,
            blocks: vec![
                UBlock { global_row: 0, values: scalar(1.0) },
                UBlock { global_row: 2, values: scalar(1.0) },
            ],
            diag: None,
        },
    ]);
    let rank1 = UFactors::new(vec![
        UColumn { global_col: 0, blocks: vec![], diag: None },
        UColumn { global_col: 1, blocks: vec![], diag: Some(scalar(2.0)) },
        UColumn { global_col: 2, blocks: vec![UBlock { global_row: 1, values: scalar(1.0) }], diag: None },
        UColumn { global_col: 3, blocks: vec![UBlock { global_row: 1, values: scalar(1.0) }], diag: Some(scalar(2.0)) },
    ]);
    (rank0, rank1)
}

/// `B` split contiguously, two rows per rank (rows 0-1 on rank0, 2-3 on
/// rank1), independent of the factor's `i % 2` diagonal ownership.
fn two_rank_n4_comm() -> SolveCommPlan {
    SolveCommPlan {
        send_counts: vec![0, 0],
        send_displs: vec![0, 0],
        recv_counts: vec![1, 1],
        recv_displs: vec![0, 0],
        row_to_proc: vec![0, 0, 1, 1],
    }
}

fn trivial_trees(n: usize, nrhs: usize) -> SolveTrees {
    SolveTrees::new(
        vec![BcTree::trivial(0, nrhs); n],
        vec![RdTree::trivial(0, nrhs); n],
    )
}

fn run_single_process_n4(use_inverse_diagonals: bool) -> Vec<f64> {
    let supernodes = SupernodeIndex::new(vec![0, 1, 2, 3, 4]);
    let grid = ProcessGrid::new(1, 1, 0, 0);
    let lfactors = n4_lfactors_single();
    let ufactors = n4_ufactors_single();
    let factors = Factors { l: &lfactors, u: &ufactors };
    let row_perm: Vec<usize> = (0..4).collect();
    let col_perm: Vec<usize> = (0..4).collect();
    let perms = Permutations { row_perm: &row_perm, col_perm: &col_perm };
    let comm = SolveCommPlan::single_process(4);
    let l_trees = trivial_trees(4, 1);
    let u_trees = trivial_trees(4, 1);
    let trees = TreeBundle { l: &l_trees, u: &u_trees };
    let cluster = build_two_sided_cluster::<f64>(1);
    let transport = &cluster[0];
    let config = SolveConfig { use_inverse_diagonals, ..SolveConfig::default() };
    let stats = SolveStats::new();

    let mut b = n4_rhs();
    let info = solve(
        4, &supernodes, &factors, &perms, &grid, &mut b, 4, 0, 1, 1, &comm, &trees, transport,
        &config, &stats,
    );
    assert!(info == 0);
    b
}

#[test]
fn single_process_unit_triangular_inverse_diagonals() {
    let x = run_single_process_n4(true);
    for (i, xi) in x.iter().enumerate() {
        assert!((xi - 1.0).abs() < 1e-10, "x[{i}] = {xi}");
    }
}

#[test]
fn single_process_unit_triangular_trsm_path() {
    let x = run_single_process_n4(false);
    for (i, xi) in x.iter().enumerate() {
        assert!((xi - 1.0).abs() < 1e-10, "x[{i}] = {xi}");
    }
}

/// Both diagonal-solve paths (precomputed inverse `GEMM` vs. direct `TRSM`)
/// must agree on the same system (Testable Property 6).
#[test]
fn inverse_and_trsm_paths_agree() {
    let via_inverse = run_single_process_n4(true);
    let via_trsm = run_single_process_n4(false);
    for (a, b) in via_inverse.iter().zip(via_trsm.iter()) {
        assert!((a - b).abs() < 1e-10);
    }
}

/// Identity `L` and `U` (n=16, nrhs=3) must leave `B` untouched.
#[test]
fn single_process_identity_factors_preserves_rhs() {
    let n = 16;
    let nrhs = 3;
    let xsup: Vec<usize> = (0..=n).collect();
    let supernodes = SupernodeIndex::new(xsup);
    let grid = ProcessGrid::new(1, 1, 0, 0);

    let lfactors = LFactors::new(
        (0..n)
            .map(|k| LColumn { global_col: k, blocks: vec![], diag: Some(scalar(1.0)) })
            .collect(),
    );
    let ufactors = UFactors::new(
        (0..n)
            .map(|k| UColumn { global_col: k, blocks: vec![], diag: Some(scalar(1.0)) })
            .collect(),
    );
    let factors = Factors { l: &lfactors, u: &ufactors };
    let row_perm: Vec<usize> = (0..n).collect();
    let col_perm: Vec<usize> = (0..n).collect();
    let perms = Permutations { row_perm: &row_perm, col_perm: &col_perm };
    let comm = SolveCommPlan::single_process(n);
    let l_trees = trivial_trees(n, nrhs);
    let u_trees = trivial_trees(n, nrhs);
    let trees = TreeBundle { l: &l_trees, u: &u_trees };
    let cluster = build_two_sided_cluster::<f64>(1);
    let transport = &cluster[0];
    let config = SolveConfig::default();
    let stats = SolveStats::new();

    let mut rng = rand::thread_rng();
    let expected: Vec<f64> = (0..n * nrhs).map(|_| rng.gen_range(-10.0..10.0)).collect();
    let mut b = expected.clone();

    let info = solve(
        n, &supernodes, &factors, &perms, &grid, &mut b, n, 0, nrhs, nrhs, &comm, &trees,
        transport, &config, &stats,
    );
    assert!(info == 0);
    for (got, want) in b.iter().zip(expected.iter()) {
        assert!((got - want).abs() < 1e-10);
    }
}

/// The n=4 system above, distributed over a real `2x1` process mesh: each
/// rank row-owns every other supernode (`row_owner(k) = k % 2`), while every
/// rank column-owns all four supernodes (`Pc=1`). Off-diagonal block
/// ownership follows the same `(row_owner(I), col_owner(J))` rule as the
/// single-process case, so each rank's local `L`/`U` holds only the blocks
/// whose `global_row`/`global_row` (respectively) lands on its own mesh row.
/// With `Pc=1` every reduction tree collapses to trivial (there is only one
/// mesh column to fold across), so this exercises cross-rank *broadcast*
/// scheduling and the per-rank workspace/dependency-counter bookkeeping, not
/// reduction.
#[test]
fn two_rank_broadcast_crosses_ranks() {
    init_tracing();
    let nrhs = 1;

    let (rank0_lfactors, rank1_lfactors) = two_rank_n4_lfactors();
    let (rank0_ufactors, rank1_ufactors) = two_rank_n4_ufactors();

    // Broadcast trees, indexed by `lbj = k` (both ranks column-own every
    // supernode under `Pc=1`): every column whose diagonal owner's block has
    // an off-diagonal consumer on the *other* rank needs a real two-party
    // tree; a column with no cross-rank consumer gets a trivial one.
    // `flat_bc_tree`'s view of a given `(root, participants)` pair differs by
    // asking rank (only the root ever gets real children), so rank0 and
    // rank1 each need their own vector built with their own rank.
    let rank0_l_bc = vec![
        flat_bc_tree(0, &[0, 1], 0, nrhs), // col0: diag rank0, consumer rank0 (row2) and none on rank1
        flat_bc_tree(1, &[0, 1], 0, nrhs), // col1: diag rank1, consumer rank0 (row2)
        flat_bc_tree(0, &[0, 1], 0, nrhs), // col2: diag rank0, consumer rank1 (row3)
        BcTree::trivial(1, nrhs),          // col3: diag rank1, no consumers
    ];
    let rank1_l_bc = vec![
        flat_bc_tree(0, &[0, 1], 1, nrhs),
        flat_bc_tree(1, &[0, 1], 1, nrhs),
        flat_bc_tree(0, &[0, 1], 1, nrhs),
        BcTree::trivial(1, nrhs),
    ];
    let rank0_u_bc = vec![
        BcTree::trivial(0, nrhs),          // col0: diag rank0, no consumers (I<0 is empty)
        flat_bc_tree(1, &[0, 1], 0, nrhs), // col1: diag rank1, consumer rank0 (row0)
        flat_bc_tree(0, &[0, 1], 0, nrhs), // col2: diag rank0, consumer rank1 (row1)
        flat_bc_tree(1, &[0, 1], 0, nrhs), // col3: diag rank1, consumers rank0 (row0,row2) and rank1 (row1)
    ];
    let rank1_u_bc = vec![
        BcTree::trivial(0, nrhs),
        flat_bc_tree(1, &[0, 1], 1, nrhs),
        flat_bc_tree(0, &[0, 1], 1, nrhs),
        flat_bc_tree(1, &[0, 1], 1, nrhs),
    ];

    // Reduction trees, indexed by `lbi`: trivial everywhere under `Pc=1`
    // (see the doc comment above).
    let rank0_l_rd = vec![RdTree::trivial(0, nrhs), RdTree::trivial(0, nrhs)];
    let rank1_l_rd = vec![RdTree::trivial(1, nrhs), RdTree::trivial(1, nrhs)];
    let rank0_u_rd = rank0_l_rd.clone();
    let rank1_u_rd = rank1_l_rd.clone();

    let rank0_l_trees = SolveTrees::new(rank0_l_bc, rank0_l_rd);
    let rank1_l_trees = SolveTrees::new(rank1_l_bc, rank1_l_rd);
    let rank0_u_trees = SolveTrees::new(rank0_u_bc, rank0_u_rd);
    let rank1_u_trees = SolveTrees::new(rank1_u_bc, rank1_u_rd);

    let comm = two_rank_n4_comm();

    let b_full = n4_rhs();
    let mut ranks = build_two_sided_cluster::<f64>(2);
    let transport1 = ranks.pop().unwrap();
    let transport0 = ranks.pop().unwrap();

    let results = std::thread::scope(|scope| {
        let h0 = scope.spawn(|| {
            let supernodes = SupernodeIndex::new(vec![0, 1, 2, 3, 4]);
            let grid = ProcessGrid::new(2, 1, 0, 0);
            let factors = Factors { l: &rank0_lfactors, u: &rank0_ufactors };
            let row_perm: Vec<usize> = (0..4).collect();
            let col_perm: Vec<usize> = (0..4).collect();
            let perms = Permutations { row_perm: &row_perm, col_perm: &col_perm };
            let trees = TreeBundle { l: &rank0_l_trees, u: &rank0_u_trees };
            let config = SolveConfig::default();
            let stats = SolveStats::new();
            let mut b = vec![b_full[0], b_full[1]];
            let info = solve(
                4, &supernodes, &factors, &perms, &grid, &mut b, 2, 0, 1, 1, &comm, &trees,
                &transport0, &config, &stats,
            );
            (info, b)
        });
        let h1 = scope.spawn(|| {
            let supernodes = SupernodeIndex::new(vec![0, 1, 2, 3, 4]);
            let grid = ProcessGrid::new(2, 1, 1, 0);
            let factors = Factors { l: &rank1_lfactors, u: &rank1_ufactors };
            let row_perm: Vec<usize> = (0..4).collect();
            let col_perm: Vec<usize> = (0..4).collect();
            let perms = Permutations { row_perm: &row_perm, col_perm: &col_perm };
            let trees = TreeBundle { l: &rank1_l_trees, u: &rank1_u_trees };
            let config = SolveConfig::default();
            let stats = SolveStats::new();
            let mut b = vec![b_full[2], b_full[3]];
            let info = solve(
                4, &supernodes, &factors, &perms, &grid, &mut b, 2, 2, 1, 1, &comm, &trees,
                &transport1, &config, &stats,
            );
            (info, b)
        });
        (h0.join().unwrap(), h1.join().unwrap())
    });

    let ((info0, b0), (info1, b1)) = results;
    assert!(info0 == 0);
    assert!(info1 == 0);
    for x in b0.iter().chain(b1.iter()) {
        assert!((x - 1.0).abs() < 1e-10);
    }
}

/// The same two-rank n=4 system as [`two_rank_broadcast_crosses_ranks`], but
/// with the trees built by the production `setup::build_l_trees`/
/// `build_u_trees` from a `GlobalBlockPattern` rather than hand-assembled —
/// exercises the tree-builder's own root/participant derivation end to end.
#[test]
fn two_rank_broadcast_via_production_tree_builder() {
    init_tracing();
    let nrhs = 1;
    let (rank0_lfactors, rank1_lfactors) = two_rank_n4_lfactors();
    let (rank0_ufactors, rank1_ufactors) = two_rank_n4_ufactors();
    let comm = two_rank_n4_comm();
    let pattern = n4_global_pattern();
    let b_full = n4_rhs();

    let mut ranks = build_two_sided_cluster::<f64>(2);
    let transport1 = ranks.pop().unwrap();
    let transport0 = ranks.pop().unwrap();

    let results = std::thread::scope(|scope| {
        let h0 = scope.spawn(|| {
            let supernodes = SupernodeIndex::new(vec![0, 1, 2, 3, 4]);
            let grid = ProcessGrid::new(2, 1, 0, 0);
            let l_trees = build_l_trees(&grid, &supernodes, &pattern, nrhs);
            let u_trees = build_u_trees(&grid, &supernodes, &pattern, nrhs);
            let factors = Factors { l: &rank0_lfactors, u: &rank0_ufactors };
            let row_perm: Vec<usize> = (0..4).collect();
            let col_perm: Vec<usize> = (0..4).collect();
            let perms = Permutations { row_perm: &row_perm, col_perm: &col_perm };
            let trees = TreeBundle { l: &l_trees, u: &u_trees };
            let config = SolveConfig::default();
            let stats = SolveStats::new();
            let mut b = vec![b_full[0], b_full[1]];
            let info = solve(
                4, &supernodes, &factors, &perms, &grid, &mut b, 2, 0, 1, 1, &comm, &trees,
                &transport0, &config, &stats,
            );
            (info, b)
        });
        let h1 = scope.spawn(|| {
            let supernodes = SupernodeIndex::new(vec![0, 1, 2, 3, 4]);
            let grid = ProcessGrid::new(2, 1, 1, 0);
            let l_trees = build_l_trees(&grid, &supernodes, &pattern, nrhs);
            let u_trees = build_u_trees(&grid, &supernodes, &pattern, nrhs);
            let factors = Factors { l: &rank1_lfactors, u: &rank1_ufactors };
            let row_perm: Vec<usize> = (0..4).collect();
            let col_perm: Vec<usize> = (0..4).collect();
            let perms = Permutations { row_perm: &row_perm, col_perm: &col_perm };
            let trees = TreeBundle { l: &l_trees, u: &u_trees };
            let config = SolveConfig::default();
            let stats = SolveStats::new();
            let mut b = vec![b_full[2], b_full[3]];
            let info = solve(
                4, &supernodes, &factors, &perms, &grid, &mut b, 2, 2, 1, 1, &comm, &trees,
                &transport1, &config, &stats,
            );
            (info, b)
        });
        (h0.join().unwrap(), h1.join().unwrap())
    });

    let ((info0, b0), (info1, b1)) = results;
    assert!(info0 == 0);
    assert!(info1 == 0);
    for x in b0.iter().chain(b1.iter()) {
        assert!((x - 1.0).abs() < 1e-10);
    }
}

/// The same two-rank n=4 system, driven over [`OneSidedTransport`] instead
/// of the channel-based two-sided cluster, confirming the RMA-simulation
/// backend satisfies the same `Transport` contract the engines depend on.
#[test]
fn two_rank_broadcast_over_one_sided_transport() {
    let nrhs = 1;
    let (rank0_lfactors, rank1_lfactors) = two_rank_n4_lfactors();
    let (rank0_ufactors, rank1_ufactors) = two_rank_n4_ufactors();
    let comm = two_rank_n4_comm();
    let pattern = n4_global_pattern();
    let b_full = n4_rhs();

    let mut ranks: Vec<OneSidedTransport<f64>> = build_one_sided_cluster(2);
    let transport1 = ranks.pop().unwrap();
    let transport0 = ranks.pop().unwrap();

    let results = std::thread::scope(|scope| {
        let h0 = scope.spawn(|| {
            let supernodes = SupernodeIndex::new(vec![0, 1, 2, 3, 4]);
            let grid = ProcessGrid::new(2, 1, 0, 0);
            let l_trees = build_l_trees(&grid, &supernodes, &pattern, nrhs);
            let u_trees = build_u_trees(&grid, &supernodes, &pattern, nrhs);
            let factors = Factors { l: &rank0_lfactors, u: &rank0_ufactors };
            let row_perm: Vec<usize> = (0..4).collect();
            let col_perm: Vec<usize> = (0..4).collect();
            let perms = Permutations { row_perm: &row_perm, col_perm: &col_perm };
            let trees = TreeBundle { l: &l_trees, u: &u_trees };
            let config = SolveConfig::default();
            let stats = SolveStats::new();
            let mut b = vec![b_full[0], b_full[1]];
            let info = solve(
                4, &supernodes, &factors, &perms, &grid, &mut b, 2, 0, 1, 1, &comm, &trees,
                &transport0, &config, &stats,
            );
            (info, b)
        });
        let h1 = scope.spawn(|| {
            let supernodes = SupernodeIndex::new(vec![0, 1, 2, 3, 4]);
            let grid = ProcessGrid::new(2, 1, 1, 0);
            let l_trees = build_l_trees(&grid, &supernodes, &pattern, nrhs);
            let u_trees = build_u_trees(&grid, &supernodes, &pattern, nrhs);
            let factors = Factors { l: &rank1_lfactors, u: &rank1_ufactors };
            let row_perm: Vec<usize> = (0..4).collect();
            let col_perm: Vec<usize> = (0..4).collect();
            let perms = Permutations { row_perm: &row_perm, col_perm: &col_perm };
            let trees = TreeBundle { l: &l_trees, u: &u_trees };
            let config = SolveConfig::default();
            let stats = SolveStats::new();
            let mut b = vec![b_full[2], b_full[3]];
            let info = solve(
                4, &supernodes, &factors, &perms, &grid, &mut b, 2, 2, 1, 1, &comm, &trees,
                &transport1, &config, &stats,
            );
            (info, b)
        });
        (h0.join().unwrap(), h1.join().unwrap())
    });

    let ((info0, b0), (info1, b1)) = results;
    assert!(info0 == 0);
    assert!(info1 == 0);
    for x in b0.iter().chain(b1.iter()) {
        assert!((x - 1.0).abs() < 1e-10);
    }
}

/// `row_perm`/`col_perm` are not identity: `scatter_b_to_x` must route each
/// external row of `B` to the internal row `col_perm[row_perm[global_row]]`
/// (spec §4.E), not straight through. Identity diagonal factors make the
/// solved `X` at internal row `j` exactly whatever `B` value landed there,
/// so the expected output is the inverse permutation of the input, not `B`
/// itself — a test that would fail if `scatter_b_to_x` ignored the
/// permutation arrays (as an identity-permutation test cannot detect).
#[test]
fn single_process_nonidentity_permutation_routes_rows() {
    let n = 4;
    let nrhs = 1;
    let supernodes = SupernodeIndex::new(vec![0, 1, 2, 3, 4]);
    let grid = ProcessGrid::new(1, 1, 0, 0);

    let lfactors = LFactors::new(
        (0..n).map(|k| LColumn { global_col: k, blocks: vec![], diag: Some(scalar(1.0)) }).collect(),
    );
    let ufactors = UFactors::new(
        (0..n).map(|k| UColumn { global_col: k, blocks: vec![], diag: Some(scalar(1.0)) }).collect(),
    );
    let factors = Factors { l: &lfactors, u: &ufactors };

    let row_perm: Vec<usize> = (0..n).collect();
    // A derangement of 0..4: external row `i` lands on internal row
    // `col_perm[i]`.
    let col_perm: Vec<usize> = vec![2, 0, 3, 1];
    let perms = Permutations { row_perm: &row_perm, col_perm: &col_perm };

    let comm = SolveCommPlan::single_process(n);
    let l_trees = trivial_trees(n, nrhs);
    let u_trees = trivial_trees(n, nrhs);
    let trees = TreeBundle { l: &l_trees, u: &u_trees };
    let cluster = build_two_sided_cluster::<f64>(1);
    let transport = &cluster[0];
    let config = SolveConfig::default();
    let stats = SolveStats::new();

    let mut b = vec![10.0, 20.0, 30.0, 40.0];
    let info = solve(
        n as i64, &supernodes, &factors, &perms, &grid, &mut b, n, 0, 1, nrhs as i64, &comm,
        &trees, transport, &config, &stats,
    );
    assert!(info == 0);

    // inverse[col_perm[i]] == i
    let mut inverse = vec![0usize; n];
    for (i, &j) in col_perm.iter().enumerate() {
        inverse[j] = i;
    }
    let expected: Vec<f64> = (0..n).map(|j| [10.0, 20.0, 30.0, 40.0][inverse[j]]).collect();
    for (got, want) in b.iter().zip(expected.iter()) {
        assert!((got - want).abs() < 1e-10);
    }
}

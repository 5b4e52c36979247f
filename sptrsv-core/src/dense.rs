//! Thin wrappers around `faer_core`'s dense kernels for the per-block
//! operations the L- and U-solve engines perform once a supernode's
//! dependencies are satisfied. Mirrors the call shape `faer-math`'s own
//! recursive LU uses for its Schur-complement update
//! (`faer-math/src/partial_pivoting/compute.rs`: `matmul(..., Some(E::one()),
//! E::one().neg(), parallelism)`).

use faer_core::{mul::matmul, ComplexField, MatMut, MatRef, Parallelism};

/// `dst -= lhs * rhs` (spec §4.F step 2: `lsum[I] -= L(I,K) · X[K]`; step 2
/// of §4.G is the same call against `U(I,K)`).
pub fn gemm_sub<E: ComplexField>(
    dst: MatMut<'_, E>,
    lhs: MatRef<'_, E>,
    rhs: MatRef<'_, E>,
    parallelism: Parallelism,
) {
    matmul(dst, lhs, rhs, Some(E::one()), E::one().neg(), parallelism);
}

/// `dst = inv * rhs`, the `useInverseDiagonals = true` path of spec §4.D:
/// one `GEMM` instead of one `TRSM`.
pub fn apply_inverse_diagonal<E: ComplexField>(
    dst: MatMut<'_, E>,
    inv: MatRef<'_, E>,
    rhs: MatRef<'_, E>,
    parallelism: Parallelism,
) {
    matmul(dst, inv, rhs, None, E::one(), parallelism);
}

/// `TRSM` against the unit lower-triangular diagonal block, the
/// `useInverseDiagonals = false` fallback of spec §4.D.
pub fn solve_unit_lower_diagonal<E: ComplexField>(
    diag: MatRef<'_, E>,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    faer_core::solve::solve_unit_lower_triangular_in_place(diag, rhs, parallelism);
}

/// `TRSM` against the upper-triangular diagonal block.
pub fn solve_upper_diagonal<E: ComplexField>(
    diag: MatRef<'_, E>,
    rhs: MatMut<'_, E>,
    parallelism: Parallelism,
) {
    faer_core::solve::solve_upper_triangular_in_place(diag, rhs, parallelism);
}

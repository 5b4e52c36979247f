use dyn_stack::{SizeOverflow, StackReq};
use faer_core::{solve, ComplexField, Entity, Mat, MatRef, Parallelism};

/// Precomputed inverses of diagonal blocks (spec §2 component D, §4.D).
///
/// Turns the innermost triangular solve of a ready supernode into one dense
/// `GEMM` against this cache instead of one `TRSM` against `L(K,K)`/`U(K,K)`
/// directly — the hot-path rationale spelled out in spec §4.D. Used only
/// when [`crate::SolveWorkspace`]'s caller sets `use_inverse_diagonals`;
/// otherwise [`crate::dense::solve_unit_lower_diagonal`]/
/// [`crate::dense::solve_upper_diagonal`] are called directly against the
/// factor instead, and this cache stays empty.
#[derive(Debug, Clone, Default)]
pub struct DiagInvCache<E: ComplexField> {
    inverses: Vec<Option<Mat<E>>>,
}

/// Scratch-sizing for building one `n x n` diagonal inverse, following the
/// `*_req` convention the teacher (`faer-math`) uses for every workspace
/// computation.
pub fn diag_inverse_req<E: Entity>(n: usize) -> Result<StackReq, SizeOverflow> {
    StackReq::try_new::<E>(n * n)
}

impl<E: ComplexField> DiagInvCache<E> {
    pub fn empty(n_local_diag: usize) -> Self {
        Self {
            inverses: vec![None; n_local_diag],
        }
    }

    pub fn get(&self, lbk: usize) -> Option<MatRef<'_, E>> {
        self.inverses[lbk].as_ref().map(|m| m.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.inverses.iter().all(|x| x.is_none())
    }

    /// Builds `Linv[K] = L(K,K)^-1` by solving `L(K,K) * Linv = I`
    /// (`faer_core::solve::solve_unit_lower_triangular_in_place`, the
    /// teacher's own way of forming an explicit triangular inverse).
    pub fn set_unit_lower_inverse(&mut self, lbk: usize, diag_block: MatRef<'_, E>) {
        let n = diag_block.nrows();
        debug_assert_eq!(n, diag_block.ncols());
        let mut inv = identity::<E>(n);
        solve::solve_unit_lower_triangular_in_place(diag_block, inv.as_mut(), Parallelism::None);
        self.inverses[lbk] = Some(inv);
    }

    /// Symmetric construction for `Uinv[K] = U(K,K)^-1`.
    pub fn set_upper_inverse(&mut self, lbk: usize, diag_block: MatRef<'_, E>) {
        let n = diag_block.nrows();
        debug_assert_eq!(n, diag_block.ncols());
        let mut inv = identity::<E>(n);
        solve::solve_upper_triangular_in_place(diag_block, inv.as_mut(), Parallelism::None);
        self.inverses[lbk] = Some(inv);
    }
}

fn identity<E: ComplexField>(n: usize) -> Mat<E> {
    let mut m = Mat::<E>::zeros(n, n);
    for i in 0..n {
        m.write(i, i, E::one());
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;
    use faer_core::mul::matmul;

    #[test]
    fn inverse_of_identity_diagonal_is_identity() {
        let n = 4;
        let diag = identity::<f64>(n);
        let mut cache = DiagInvCache::<f64>::empty(1);
        cache.set_unit_lower_inverse(0, diag.as_ref());
        let inv = cache.get(0).unwrap();
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((inv.read(i, j) - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn inverse_composes_back_to_identity() {
        let n = 3;
        let mut diag = identity::<f64>(n);
        diag.write(1, 0, 0.5);
        diag.write(2, 0, -0.25);
        diag.write(2, 1, 1.5);

        let mut cache = DiagInvCache::<f64>::empty(1);
        cache.set_unit_lower_inverse(0, diag.as_ref());
        let inv = cache.get(0).unwrap();

        let mut product = Mat::<f64>::zeros(n, n);
        matmul(
            product.as_mut(),
            diag.as_ref(),
            inv,
            None,
            1.0,
            Parallelism::None,
        );
        for i in 0..n {
            for j in 0..n {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((product.read(i, j) - expected).abs() < 1e-9);
            }
        }
    }
}

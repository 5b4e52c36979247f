use crate::grid::ProcessGrid;

/// Supernode / ownership index (spec §2 component A, §3 "Supernode K").
///
/// `xsup[k]` is the global first row of supernode `k`; `xsup[nsupers]` is
/// one past the last row of the last supernode, so `size(k) = xsup[k+1] -
/// xsup[k]`. This table, like the process grid, is produced by a prior
/// symbolic-factorization step and consumed here read-only.
#[derive(Debug, Clone)]
pub struct SupernodeIndex {
    xsup: Vec<usize>,
}

impl SupernodeIndex {
    pub fn new(xsup: Vec<usize>) -> Self {
        assert!(
            xsup.len() >= 1 && xsup.windows(2).all(|w| w[0] <= w[1]),
            "xsup must be a nondecreasing sequence with at least a sentinel"
        );
        Self { xsup }
    }

    pub fn nsupers(&self) -> usize {
        self.xsup.len() - 1
    }

    pub fn size(&self, k: usize) -> usize {
        self.xsup[k + 1] - self.xsup[k]
    }

    pub fn first_row(&self, k: usize) -> usize {
        self.xsup[k]
    }

    pub fn n(&self) -> usize {
        *self.xsup.last().unwrap()
    }

    /// The supernode owning global row `row`.
    pub fn block_of_row(&self, row: usize) -> usize {
        match self.xsup.binary_search(&row) {
            Ok(k) if k == self.nsupers() => k - 1,
            Ok(k) => k,
            Err(k) => k - 1,
        }
    }

    pub fn row_owner(&self, grid: &ProcessGrid, k: usize) -> usize {
        grid.row_owner(k)
    }

    pub fn col_owner(&self, grid: &ProcessGrid, k: usize) -> usize {
        grid.col_owner(k)
    }

    /// True when `grid` is the diagonal process for supernode `k` — the
    /// only process ever allowed to write the final `X[K]` (spec §3
    /// invariant 1).
    pub fn is_diagonal_process(&self, grid: &ProcessGrid, k: usize) -> bool {
        self.row_owner(grid, k) == grid.myrow() && self.col_owner(grid, k) == grid.mycol()
    }

    /// `lbi(K)`: local block-row index of `k`, if this process's mesh row
    /// owns it.
    pub fn local_block_row(&self, grid: &ProcessGrid, k: usize) -> Option<usize> {
        (self.row_owner(grid, k) == grid.myrow()).then(|| k / grid.pr())
    }

    /// `lbj(K)`: local block-column index of `k`, if this process's mesh
    /// column owns it.
    pub fn local_block_col(&self, grid: &ProcessGrid, k: usize) -> Option<usize> {
        (self.col_owner(grid, k) == grid.mycol()).then(|| k / grid.pc())
    }

    /// Number of supernodes whose block row this process owns.
    pub fn num_local_block_rows(&self, grid: &ProcessGrid) -> usize {
        (0..self.nsupers())
            .filter(|&k| self.row_owner(grid, k) == grid.myrow())
            .count()
    }

    /// Number of supernodes whose block column this process owns.
    pub fn num_local_block_cols(&self, grid: &ProcessGrid) -> usize {
        (0..self.nsupers())
            .filter(|&k| self.col_owner(grid, k) == grid.mycol())
            .count()
    }
}

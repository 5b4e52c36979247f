/// Global (replicated) symbolic block structure (spec §2 component C
/// input): for each supernode column `k`, the global row ids of `L`'s
/// (respectively `U`'s) off-diagonal blocks in that column, across *every*
/// rank, not just this one.
///
/// This is the output of symbolic factorization (out of scope here, spec
/// §1). A real deployment replicates it to every process ahead of the
/// numeric factorization, the same way SuperLU_DIST's `Glu_persist`
/// subscripts are replicated so every process can build its own
/// `LBtree`/`LRtree` independently, with no further communication, once it
/// also knows the process grid.
#[derive(Debug, Clone)]
pub struct GlobalBlockPattern {
    /// `l_columns[k]` — global rows of `L`'s off-diagonal blocks in column `k`.
    pub l_columns: Vec<Vec<usize>>,
    /// `u_columns[k]` — global rows of `U`'s off-diagonal blocks in column `k`.
    pub u_columns: Vec<Vec<usize>>,
}

impl GlobalBlockPattern {
    pub fn new(l_columns: Vec<Vec<usize>>, u_columns: Vec<Vec<usize>>) -> Self {
        assert_eq!(
            l_columns.len(),
            u_columns.len(),
            "L and U must describe the same number of supernodes"
        );
        Self { l_columns, u_columns }
    }

    pub fn nsupers(&self) -> usize {
        self.l_columns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn nsupers_matches_column_count() {
        let pattern = GlobalBlockPattern::new(vec![vec![], vec![0]], vec![vec![], vec![]]);
        assert!(pattern.nsupers() == 2);
    }

    #[test]
    #[should_panic(expected = "same number of supernodes")]
    fn mismatched_column_counts_panic() {
        GlobalBlockPattern::new(vec![vec![]], vec![vec![], vec![]]);
    }
}

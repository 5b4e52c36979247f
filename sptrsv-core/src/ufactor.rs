use faer_core::{ComplexField, Mat, MatRef};

/// One dense nonzero block `U(I, J)` in local block-column `J`, `I`
/// identified by its *global* supernode id — the mirror of
/// [`crate::lfactor::LBlock`], with `I < J` instead of `I > J`.
#[derive(Debug, Clone)]
pub struct UBlock<E: ComplexField> {
    pub global_row: usize,
    pub values: Mat<E>,
}

impl<E: ComplexField> UBlock<E> {
    pub fn as_ref(&self) -> MatRef<'_, E> {
        self.values.as_ref()
    }
}

/// The nonzero blocks owned by one local block column `J`, in increasing
/// global-row order, plus (when `J` is a diagonal column) the dense
/// upper-triangular diagonal block itself.
#[derive(Debug, Clone)]
pub struct UColumn<E: ComplexField> {
    pub global_col: usize,
    /// Off-diagonal nonzero blocks `U(I, J)` with `I < J`.
    pub blocks: Vec<UBlock<E>>,
    /// `U(J, J)`, present only on the diagonal process for `J`.
    pub diag: Option<Mat<E>>,
}

impl<E: ComplexField> UColumn<E> {
    pub fn block_row_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().map(|b| b.global_row)
    }
}

/// Per-process local U factor: one [`UColumn`] per local block column this
/// process owns (`colOwner(J) == mycol`), indexed by `lbj(J)` — the same
/// layout [`crate::lfactor::LFactors`] uses, since back substitution needs
/// the same "look up this column's off-diagonal rows" access pattern
/// forward substitution does, just walking rows above the diagonal instead
/// of below it.
#[derive(Debug, Clone, Default)]
pub struct UFactors<E: ComplexField> {
    columns: Vec<UColumn<E>>,
}

impl<E: ComplexField> UFactors<E> {
    pub fn new(columns: Vec<UColumn<E>>) -> Self {
        Self { columns }
    }

    pub fn column(&self, lbj: usize) -> &UColumn<E> {
        &self.columns[lbj]
    }

    pub fn num_local_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[UColumn<E>] {
        &self.columns
    }
}

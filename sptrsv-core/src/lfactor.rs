use faer_core::{ComplexField, Mat, MatRef};

/// One dense nonzero block `L(I, J)` in local block-column `J`, `I`
/// identified by its *global* supernode id (spec §3: "row-index array
/// listing nonzero block rows in J").
#[derive(Debug, Clone)]
pub struct LBlock<E: ComplexField> {
    pub global_row: usize,
    pub values: Mat<E>,
}

impl<E: ComplexField> LBlock<E> {
    pub fn as_ref(&self) -> MatRef<'_, E> {
        self.values.as_ref()
    }
}

/// The nonzero blocks owned by one local block column `J`, in increasing
/// global-row order, plus (when `J` is a diagonal column) the dense unit
/// lower-triangular diagonal block itself.
#[derive(Debug, Clone)]
pub struct LColumn<E: ComplexField> {
    pub global_col: usize,
    /// Off-diagonal nonzero blocks `L(I, J)` with `I > J`.
    pub blocks: Vec<LBlock<E>>,
    /// `L(J, J)`, present only on the diagonal process for `J`.
    pub diag: Option<Mat<E>>,
}

impl<E: ComplexField> LColumn<E> {
    pub fn block_row_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.blocks.iter().map(|b| b.global_row)
    }
}

/// Per-process local L factor: one [`LColumn`] per local block column this
/// process owns (`colOwner(J) == mycol`), indexed by `lbj(J)`.
#[derive(Debug, Clone, Default)]
pub struct LFactors<E: ComplexField> {
    columns: Vec<LColumn<E>>,
}

impl<E: ComplexField> LFactors<E> {
    pub fn new(columns: Vec<LColumn<E>>) -> Self {
        Self { columns }
    }

    pub fn column(&self, lbj: usize) -> &LColumn<E> {
        &self.columns[lbj]
    }

    pub fn num_local_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[LColumn<E>] {
        &self.columns
    }
}

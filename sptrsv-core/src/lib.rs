//! Core data model for the distributed sparse triangular solve.
//!
//! This crate owns the pieces of state the L- and U-solve engines in
//! `sptrsv-solve` read and write: the supernode/ownership index, the
//! per-process L and U factor layouts, the diagonal-inverse cache, and the
//! header-prefixed `x`/`lsum` arrays together with their dependency
//! counters. Factorization, symbolic analysis, equilibration, permutation
//! construction, and process-grid construction are external collaborators
//! — this crate only consumes their output.

pub mod commplan;
pub mod dense;
pub mod diaginv;
pub mod error;
pub mod grid;
pub mod lfactor;
pub mod pattern;
pub mod supernode;
pub mod ufactor;
pub mod workspace;

pub use commplan::SolveCommPlan;
pub use diaginv::DiagInvCache;
pub use error::{fatal, AbortReason, SolveError};
pub use grid::ProcessGrid;
pub use lfactor::{LBlock, LColumn, LFactors};
pub use pattern::GlobalBlockPattern;
pub use supernode::SupernodeIndex;
pub use ufactor::{UBlock, UColumn, UFactors};
pub use workspace::{HeaderWord, SolveWorkspace};

pub use faer_core::{ComplexField, Entity, Mat, MatMut, MatRef, Parallelism};

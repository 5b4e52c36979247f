use thiserror::Error;

/// Errors surfaced through `info` at the solve entry point (spec §7:
/// "argument validation"). Every other fault kind below is fatal and never
/// constructs one of these — they never propagate past `solve`.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum SolveError {
    #[error("matrix order n must be nonnegative, got {0}")]
    InvalidOrder(i64),
    #[error("nrhs must be nonnegative, got {0}")]
    InvalidNrhs(i64),
    #[error("ldb ({ldb}) must be at least m_loc ({m_loc})")]
    InvalidLdb { ldb: usize, m_loc: usize },
}

impl SolveError {
    /// `info = -k`: `k` is the 1-based position of the offending argument
    /// in the `solve` signature (`n`, ..., `ldb`, `nrhs`, ...).
    pub fn info_code(&self) -> i32 {
        match self {
            SolveError::InvalidOrder(_) => -1,
            SolveError::InvalidLdb { .. } => -8,
            SolveError::InvalidNrhs(_) => -9,
        }
    }
}

/// Reasons a fatal abort may be raised (spec §7): allocation failure or a
/// protocol violation. There is no recovery path for either — no retry, no
/// partial progress.
#[derive(Debug, Error, Clone)]
pub enum AbortReason {
    #[error("allocation failure while sizing {what}")]
    Allocation { what: &'static str },
    #[error("received header {got} outside of valid supernode range [0, {nsupers})")]
    HeaderOutOfRange { got: i64, nsupers: usize },
    #[error(
        "received more messages than the communication plan predicted: \
         {counter} exceeded the expected count of {expected}"
    )]
    MessageBudgetExceeded {
        counter: &'static str,
        expected: usize,
    },
}

/// Aborts the process. Spec §7 makes this the only response to a protocol
/// violation or allocation failure. We panic rather than `process::exit` so
/// the abort stays observable through `catch_unwind` in tests without
/// pretending it is a recoverable error.
#[track_caller]
pub fn fatal(reason: AbortReason) -> ! {
    tracing::error!(%reason, "fatal abort in distributed triangular solve");
    panic!("sptrsv: fatal abort: {reason}");
}

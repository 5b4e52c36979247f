/// Precomputed all-to-all send/recv counts and displacements for
/// redistributing `B` onto (and `X` off of) the diagonal processes (spec
/// §2 component B, §4.E). Built by the setup routine; the core treats it as
/// opaque, read-only input.
#[derive(Debug, Clone)]
pub struct SolveCommPlan {
    /// `send_counts[p]` — values rank `p` sends out in the forward (B→X)
    /// exchange.
    pub send_counts: Vec<i32>,
    pub send_displs: Vec<i32>,
    /// `recv_counts[p]` — total values rank `p` receives in the forward
    /// (B→X) exchange, summed over every sender. This plan is replicated
    /// identically to every rank (like `row_to_proc`), so a rank reads its
    /// own expected count as `recv_counts[self_rank]` — that is how
    /// `sptrsv-solve`'s `redistribute::scatter_b_to_x` uses it — rather
    /// than needing a separate per-sender breakdown.
    pub recv_counts: Vec<i32>,
    pub recv_displs: Vec<i32>,
    /// `row_to_proc[global_row]` — rank owning that row in `B`'s own
    /// (caller-supplied `fst_row`/`m_loc`) distribution, used by the
    /// backward (X→B) pass to route a solved row back to wherever it
    /// originally came from. This is independent of the factor's
    /// block-cyclic diagonal ownership, which the backward pass derives
    /// directly from the process grid instead (spec §4.E).
    pub row_to_proc: Vec<i32>,
}

impl SolveCommPlan {
    pub fn nprocs(&self) -> usize {
        self.send_counts.len()
    }

    pub fn total_send(&self) -> i32 {
        self.send_counts.iter().sum()
    }

    pub fn total_recv(&self) -> i32 {
        self.recv_counts.iter().sum()
    }

    /// The trivial plan for a single-process grid: everything stays local,
    /// no counts are ever consulted by the redistributor's single-process
    /// shortcut (spec §4.E), but we still give every rank a consistent,
    /// well-formed plan.
    pub fn single_process(n: usize) -> Self {
        Self {
            send_counts: vec![n as i32],
            send_displs: vec![0],
            recv_counts: vec![n as i32],
            recv_displs: vec![0],
            row_to_proc: vec![0; n],
        }
    }
}

//! Per-local-column broadcast trees and per-local-row reduction trees
//! (spec §2 component C, §3 "Trees", §4.C). Constructed once by the setup
//! routine (`sptrsv_solve::setup::build_l_trees`/`build_u_trees`) and
//! treated as opaque, read-only collaborators during the solve — the
//! engines in `sptrsv-solve` only ever call the accessors below.
//!
//! Only the flat (star) shape is built anywhere in this workspace (spec §9
//! names binomial and k-ary as alternative shapes a real deployment might
//! pick for larger meshes; this workspace's seed scenarios never exceed a
//! handful of participants per tree, so the extra fan-in/fan-out control
//! those shapes buy never pays for itself here).

/// A broadcast tree rooted at the diagonal process of one local block
/// column, propagating `X[K]` to every process owning a block in that
/// column (GLOSSARY).
#[derive(Debug, Clone)]
pub struct BcTree {
    root: usize,
    children: Vec<usize>,
    msg_size: usize,
}

impl BcTree {
    pub fn new(root: usize, children: Vec<usize>, msg_size: usize) -> Self {
        Self {
            root,
            children,
            msg_size,
        }
    }

    /// A tree with no participants but this rank — `X[K]` never leaves the
    /// process (e.g. a `Pr=Pc=1` grid, Testable Property 10).
    pub fn trivial(root: usize, msg_size: usize) -> Self {
        Self::new(root, Vec::new(), msg_size)
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn is_root(&self, rank: usize) -> bool {
        rank == self.root
    }

    /// Immediate children to relay this tree's messages to.
    pub fn children(&self) -> &[usize] {
        &self.children
    }

    /// Payload words excluding the header (spec §4.C: `msgSize`).
    pub fn msg_size(&self) -> usize {
        self.msg_size
    }

    /// Immediate children (spec §4.C: `destCount`).
    pub fn dest_count(&self) -> usize {
        self.children.len()
    }
}

/// A reduction tree whose leaves are off-diagonal contributors to a row and
/// whose root is the row's diagonal process (GLOSSARY). Every non-root node
/// has exactly one parent to forward to (spec §4.C: "parents-to-forward-to
/// (reduce, always 1)").
#[derive(Debug, Clone)]
pub struct RdTree {
    root: usize,
    parent: Option<usize>,
    /// Number of reduce-tree children this node waits on before folding
    /// and forwarding (spec §3: `frecv`/`brecv` at the tree-node level).
    num_children: usize,
    msg_size: usize,
}

impl RdTree {
    pub fn new(root: usize, parent: Option<usize>, num_children: usize, msg_size: usize) -> Self {
        Self {
            root,
            parent,
            num_children,
            msg_size,
        }
    }

    pub fn trivial(root: usize, msg_size: usize) -> Self {
        Self::new(root, None, 0, msg_size)
    }

    pub fn root(&self) -> usize {
        self.root
    }

    pub fn is_root(&self, rank: usize) -> bool {
        rank == self.root
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn num_children(&self) -> usize {
        self.num_children
    }

    pub fn msg_size(&self) -> usize {
        self.msg_size
    }

    /// One parent to forward to, or zero at the root (spec §4.C).
    pub fn dest_count(&self) -> usize {
        if self.parent.is_some() {
            1
        } else {
            0
        }
    }
}

/// Builds this rank's view of a flat (star) broadcast tree rooted at
/// `root` spanning `participants`: the root relays directly to every other
/// participant, and everyone else is a pure leaf with nothing further to
/// forward. Like [`flat_rd_tree`], the caller's own `rank` has to be given
/// explicitly — a flat tree's `children` differ depending on whether the
/// asking rank is the root, so the same `(root, participants)` pair yields
/// a different [`BcTree`] per rank.
pub fn flat_bc_tree(root: usize, participants: &[usize], rank: usize, msg_size: usize) -> BcTree {
    let children = if rank == root {
        participants.iter().copied().filter(|&p| p != root).collect()
    } else {
        Vec::new()
    };
    BcTree::new(root, children, msg_size)
}

/// Builds the matching flat reduction tree: every non-root participant is a
/// direct child of `root`.
pub fn flat_rd_tree(root: usize, participants: &[usize], rank: usize, msg_size: usize) -> RdTree {
    let non_root_count = participants.iter().filter(|&&p| p != root).count();
    if rank == root {
        RdTree::new(root, None, non_root_count, msg_size)
    } else {
        RdTree::new(root, Some(root), 0, msg_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::assert;

    #[test]
    fn flat_tree_has_no_interior_nodes() {
        let participants = [0, 1, 2, 3];
        let bc_root = flat_bc_tree(0, &participants, 0, 4);
        assert!(bc_root.dest_count() == 3);
        assert!(bc_root.is_root(0));
        assert!(!bc_root.is_root(1));

        let bc_leaf = flat_bc_tree(0, &participants, 2, 4);
        assert!(bc_leaf.dest_count() == 0);
        assert!(!bc_leaf.is_root(2));

        let rd_root = flat_rd_tree(0, &participants, 0, 4);
        assert!(rd_root.num_children() == 3);
        assert!(rd_root.dest_count() == 0);

        let rd_leaf = flat_rd_tree(0, &participants, 2, 4);
        assert!(rd_leaf.dest_count() == 1);
        assert!(rd_leaf.parent() == Some(0));
    }

    #[test]
    fn trivial_tree_has_no_destinations() {
        let bc = BcTree::trivial(0, 4);
        assert!(bc.dest_count() == 0);
        let rd = RdTree::trivial(0, 4);
        assert!(rd.dest_count() == 0);
        assert!(rd.num_children() == 0);
    }
}

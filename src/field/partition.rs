//! Union-find-by-enumeration used by connected-component labeling.
//!
//! Each cell holds the set of provisional labels that merged into it. The
//! original design used fixed-capacity buffers; these grow on demand up to
//! a hard cap, and exceeding the cap is a structured error rather than an
//! abort.

use crate::error::{Result, VerifyError};

/// Hard cap on distinct cells; label values must stay representable as
/// quantized field codes.
pub const MAX_CELLS: usize = 65_525;

/// One connected component: the provisional labels it has absorbed.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    elements: Vec<i32>,
}

impl Cell {
    pub fn has(&self, k: i32) -> bool {
        self.elements.contains(&k)
    }

    pub fn add(&mut self, k: i32) {
        if !self.has(k) {
            self.elements.push(k);
        }
    }

    pub fn elements(&self) -> &[i32] {
        &self.elements
    }
}

/// An ordered set of cells. Cell order is creation order, which gives the
/// dense 1..N labels of the second labeling pass; merging keeps the earlier
/// cell so the smallest representative wins.
#[derive(Debug, Clone, Default)]
pub struct Partition {
    cells: Vec<Cell>,
}

impl Partition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, i: usize) -> &Cell {
        &self.cells[i]
    }

    pub fn has(&self, k: i32) -> bool {
        self.which_cell(k).is_some()
    }

    /// Index of the cell containing label `k`.
    pub fn which_cell(&self, k: i32) -> Option<usize> {
        self.cells.iter().position(|c| c.has(k))
    }

    /// Merge the cell at `j2` into the cell at `j1` (the earlier index
    /// survives regardless of argument order).
    pub fn merge_cells(&mut self, j1: usize, j2: usize) {
        if j1 == j2 {
            return;
        }
        let (keep, drop) = if j1 < j2 { (j1, j2) } else { (j2, j1) };
        let moved = self.cells.remove(drop);
        for &e in moved.elements() {
            self.cells[keep].add(e);
        }
    }

    /// Merge the cells containing labels `v1` and `v2`, creating cells for
    /// unseen labels first.
    pub fn merge_values(&mut self, v1: i32, v2: i32) -> Result<()> {
        let j1 = match self.which_cell(v1) {
            Some(j) => j,
            None => self.push_label(v1)?,
        };
        let j2 = match self.which_cell(v2) {
            Some(j) => j,
            None => self.push_label(v2)?,
        };
        self.merge_cells(j1, j2);
        Ok(())
    }

    /// Record a brand-new label in its own cell.
    pub fn add(&mut self, k: i32) -> Result<()> {
        if self.has(k) {
            return Ok(());
        }
        self.push_label(k)?;
        Ok(())
    }

    fn push_label(&mut self, k: i32) -> Result<usize> {
        if self.cells.len() >= MAX_CELLS {
            return Err(VerifyError::PartitionOverflow { max: MAX_CELLS });
        }
        let mut cell = Cell::default();
        cell.add(k);
        self.cells.push(cell);
        Ok(self.cells.len() - 1)
    }
}

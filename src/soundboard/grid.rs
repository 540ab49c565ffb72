//! Slot grid: maps the 2-D slot space to clip store positions.

use log::warn;

use crate::soundboard::clip::{ClipEntry, ClipId};
use crate::soundboard::constants::{ADD_SOUND_LABEL, GRID_COLS, GRID_ROWS};
use crate::soundboard::mode::{MenuAffordance, MenuCell, Mode};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridSize {
    pub rows: usize,
    pub cols: usize,
}

impl GridSize {
    pub fn contains(&self, row: i32, col: i32) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self {
            rows: GRID_ROWS,
            cols: GRID_COLS,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotCoord {
    pub row: usize,
    pub col: usize,
}

impl SlotCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Anything the user can tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    Cell(SlotCoord),
    Menu(MenuCell),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    /// Bound to the store entry at `index`.
    Clip {
        index: usize,
        id: ClipId,
        label: String,
    },
    Empty,
}

/// Complete binding of every cell of the grid for one mode.
#[derive(Clone, Debug, PartialEq)]
pub struct GridMap {
    size: GridSize,
    mode: Mode,
    cells: Vec<Cell>,
}

impl GridMap {
    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// `None` for coordinates outside the grid.
    pub fn resolve(&self, coord: SlotCoord) -> Option<&Cell> {
        if coord.row >= self.size.rows || coord.col >= self.size.cols {
            return None;
        }
        self.cells.get(coord.row * self.size.cols + coord.col)
    }

    /// Text for a slot. Empty cells read "=Add Sound=" in Play mode and are blank otherwise.
    pub fn label(&self, coord: SlotCoord) -> Option<&str> {
        match self.resolve(coord)? {
            Cell::Clip { label, .. } => Some(label.as_str()),
            Cell::Empty if self.mode == Mode::Play => Some(ADD_SOUND_LABEL),
            Cell::Empty => Some(""),
        }
    }

    pub fn menu(&self, cell: MenuCell) -> MenuAffordance {
        self.mode.affordance(cell)
    }

    /// First empty cell in row-major order.
    pub fn first_empty(&self) -> Option<SlotCoord> {
        self.iter()
            .find(|(_, cell)| matches!(cell, Cell::Empty))
            .map(|(coord, _)| coord)
    }

    /// Cells in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotCoord, &Cell)> {
        let cols = self.size.cols;
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, cell)| (SlotCoord::new(i / cols, i % cols), cell))
    }
}

pub struct GridBinder;

impl GridBinder {
    /// Builds the grid map for `mode` from the store's entries and their ids.
    ///
    /// Unplaced entries are left out. Out-of-grid and duplicate placements are skipped, the first
    /// entry for a cell wins.
    pub fn bind(entries: &[ClipEntry], ids: &[ClipId], mode: Mode, size: GridSize) -> GridMap {
        let mut cells = vec![Cell::Empty; size.cell_count()];

        for (index, (entry, id)) in entries.iter().zip(ids).enumerate() {
            if !entry.is_placed() {
                continue;
            }
            if !size.contains(entry.row, entry.col) {
                warn!(
                    "Clip \"{}\" at ({}, {}) is outside the {}x{} grid, not shown",
                    entry.display_name, entry.row, entry.col, size.rows, size.cols
                );
                continue;
            }

            let slot = &mut cells[entry.row as usize * size.cols + entry.col as usize];
            if let Cell::Clip { label, .. } = slot {
                warn!(
                    "Clip \"{}\" shares ({}, {}) with \"{}\", not shown",
                    entry.display_name, entry.row, entry.col, label
                );
                continue;
            }

            *slot = Cell::Clip {
                index,
                id: *id,
                label: entry.display_name.clone(),
            };
        }

        GridMap { size, mode, cells }
    }
}

use crate::error::{KcResult, KeyCadError};
use crate::geometry::{Key, Layout};
use serde::Serialize;
use strum_macros::Display;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "snake_case")]
pub enum MatrixMode {
    /// One matrix row per physical row, one column per position within a row.
    Natural,
    /// ceil(sqrt(n)) on each side, filled left to right.
    Square,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct MatrixPosition {
    pub row: usize,
    pub col: usize,
}

impl MatrixPosition {
    /// Human readable slot name, e.g. `C5` for row 2, column 5.
    pub fn identifier(&self) -> String {
        let letter = char::from_u32('A' as u32 + self.row as u32).unwrap_or('?');
        format!("{}{}", letter, self.col)
    }
}

/// Final scan matrix. Cells hold indices into the layout's key list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Matrix {
    mode: MatrixMode,
    row_count: usize,
    col_count: usize,
    cells: Vec<Option<usize>>,
    positions: Vec<MatrixPosition>,
}

impl Matrix {
    pub fn mode(&self) -> MatrixMode {
        self.mode
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    pub fn key_count(&self) -> usize {
        self.positions.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<usize> {
        if row >= self.row_count || col >= self.col_count {
            return None;
        }
        self.cells[row * self.col_count + col]
    }

    pub fn position_of(&self, key_index: usize) -> Option<MatrixPosition> {
        self.positions.get(key_index).copied()
    }

    pub fn positions(&self) -> &[MatrixPosition] {
        &self.positions
    }

    /// Rows with at least one key, ascending. Empty rows never get a GPIO.
    pub fn active_rows(&self) -> Vec<usize> {
        (0..self.row_count)
            .filter(|&r| (0..self.col_count).any(|c| self.cell(r, c).is_some()))
            .collect()
    }

    pub fn active_cols(&self) -> Vec<usize> {
        (0..self.col_count)
            .filter(|&c| (0..self.row_count).any(|r| self.cell(r, c).is_some()))
            .collect()
    }

    pub fn pins_required(&self) -> usize {
        self.active_rows().len() + self.active_cols().len()
    }

    pub fn row_net_name(row: usize) -> String {
        format!("ROW_{}", row + 1)
    }

    pub fn col_net_name(col: usize) -> String {
        format!("COL_{}", col + 1)
    }

    fn from_positions(mode: MatrixMode, rows: usize, cols: usize, positions: Vec<MatrixPosition>) -> Self {
        let mut cells = vec![None; rows * cols];
        for (key_index, pos) in positions.iter().enumerate() {
            cells[pos.row * cols + pos.col] = Some(key_index);
        }
        Self {
            mode,
            row_count: rows,
            col_count: cols,
            cells,
            positions,
        }
    }
}

/// Walks keys in traversal order; a change in y starts a new matrix row.
fn natural_positions(keys: &[Key]) -> (Vec<MatrixPosition>, usize, usize) {
    let mut positions = Vec::with_capacity(keys.len());
    let mut row = 0;
    let mut col = 0;
    let mut rows = 0;
    let mut cols = 0;
    let mut previous_y: Option<f64> = None;

    for key in keys {
        if let Some(y) = previous_y {
            if key.y != y {
                row += 1;
                col = 0;
            }
        }
        previous_y = Some(key.y);

        positions.push(MatrixPosition { row, col });
        rows = rows.max(row + 1);
        cols = cols.max(col + 1);
        col += 1;
    }

    (positions, rows, cols)
}

fn square_positions(key_count: usize, size: usize) -> Vec<MatrixPosition> {
    (0..key_count)
        .map(|i| MatrixPosition {
            row: i / size,
            col: i % size,
        })
        .collect()
}

pub fn ceil_sqrt(n: usize) -> usize {
    let mut s = (n as f64).sqrt().ceil() as usize;
    while s * s < n {
        s += 1;
    }
    while s > 0 && (s - 1) * (s - 1) >= n {
        s -= 1;
    }
    s
}

pub struct MatrixAllocator;

impl MatrixAllocator {
    /// Decides the matrix shape for `layout` given the GPIOs left for rows and
    /// columns, and assigns every key a unique cell.
    pub fn allocate(layout: &Layout, available_gpios: usize) -> KcResult<Matrix> {
        let (positions, rows, cols) = natural_positions(&layout.keys);

        if rows != layout.row_count || cols != layout.max_col_count {
            debug!(
                "Observed natural matrix {}x{} differs from parsed rows/cols {}x{}",
                rows, cols, layout.row_count, layout.max_col_count
            );
        }

        if rows + cols <= available_gpios {
            info!(
                "Matrix: natural {} rows x {} cols ({} of {} GPIOs)",
                rows,
                cols,
                rows + cols,
                available_gpios
            );
            return Ok(Matrix::from_positions(MatrixMode::Natural, rows, cols, positions));
        }

        let size = ceil_sqrt(layout.key_count());
        if 2 * size > available_gpios {
            return Err(KeyCadError::Capacity {
                mode: MatrixMode::Square.to_string(),
                rows: size,
                cols: size,
                available: available_gpios,
            });
        }

        info!(
            "Matrix: natural {}+{} exceeds {} GPIOs, falling back to square {}x{}",
            rows, cols, available_gpios, size, size
        );
        let positions = square_positions(layout.key_count(), size);
        Ok(Matrix::from_positions(MatrixMode::Square, size, size, positions))
    }
}

//! Grid addressing
//!
//! Positions in the storage grid are written as a row letter followed by a 1-based column
//! number, e.g. `B4` is the fourth bin of the second row. This module converts between those
//! tokens and zero-based `(row, col)` pairs.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

mod range;
pub use range::*;

/// Highest row count that can be addressed with a single row letter
pub const MAX_ROWS: usize = 26;

lazy_static! {
    static ref POSITION_TOKEN: Regex = Regex::new(r"^([A-Z])([1-9][0-9]*)$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("malformed position token: {0:?}")]
    MalformedToken(String),
    #[error("malformed position range: {0:?}")]
    MalformedRange(String),
    #[error("position {position} is outside of the {rows}x{columns} grid")]
    OutOfRange {
        position: String,
        rows: usize,
        columns: usize,
    },
}

/// A cell of the grid, as zero-based row and column indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    row: usize,
    col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.row < MAX_ROWS {
            write!(f, "{}{}", (b'A' + self.row as u8) as char, self.col + 1)
        } else {
            write!(f, "({}, {})", self.row, self.col)
        }
    }
}

/// Dimensions of the logical storage grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    rows: usize,
    columns: usize,
}

impl Grid {
    pub const fn new(rows: usize, columns: usize) -> Self {
        Self { rows, columns }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of cells in the grid
    pub fn len(&self) -> usize {
        self.rows * self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, position: Position) -> bool {
        position.row < self.rows.min(MAX_ROWS) && position.col < self.columns
    }

    fn out_of_range(&self, position: impl ToString) -> GridError {
        GridError::OutOfRange {
            position: position.to_string(),
            rows: self.rows,
            columns: self.columns,
        }
    }

    /// Check that a position lies within the grid
    pub fn check(&self, position: Position) -> Result<Position, GridError> {
        if self.contains(position) {
            Ok(position)
        } else {
            Err(self.out_of_range(position))
        }
    }

    /// Format the token for the given zero-based row and column
    ///
    /// # Errors
    ///
    /// [GridError::OutOfRange] if the cell is not part of this grid.
    pub fn encode(&self, row: usize, col: usize) -> Result<String, GridError> {
        Ok(self.check(Position::new(row, col))?.to_string())
    }

    /// Parse a position token
    ///
    /// The token must be a single uppercase letter immediately followed by a column number
    /// starting at 1, without leading zeros. Only canonical tokens are accepted, so
    /// `encode(decode(token)) == token` for every token that decodes.
    ///
    /// # Errors
    ///
    /// [GridError::MalformedToken] if the token doesn't match that pattern,
    /// [GridError::OutOfRange] if it designates a cell outside of this grid.
    pub fn decode(&self, token: &str) -> Result<Position, GridError> {
        let captures = POSITION_TOKEN
            .captures(token)
            .ok_or_else(|| GridError::MalformedToken(token.to_owned()))?;

        let row = (captures[1].as_bytes()[0] - b'A') as usize;
        // The pattern only admits digits, so a parse failure is an overflow
        let col = captures[2]
            .parse::<usize>()
            .map_err(|_| self.out_of_range(token))?
            - 1;

        let position = Position::new(row, col);
        if self.contains(position) {
            Ok(position)
        } else {
            Err(self.out_of_range(token))
        }
    }

    /// Iterate over all cells, in row-major order
    pub fn positions(&self) -> impl Iterator<Item = Position> {
        let columns = self.columns;
        (0..self.rows.min(MAX_ROWS))
            .flat_map(move |row| (0..columns).map(move |col| Position::new(row, col)))
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new(5, 5)
    }
}

use serde_derive::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::grid::{Grid, Position, MAX_ROWS};

/// Order in which the LED strip runs through the grid cells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Wiring {
    /// Left to right, top to bottom
    RowMajor,
    /// Left to right on even rows, right to left on odd rows
    Serpentine,
    /// Explicit LED index for every cell, listed in row-major order
    Table(Vec<usize>),
}

impl Default for Wiring {
    fn default() -> Self {
        Self::RowMajor
    }
}

impl Wiring {
    /// Linear LED index for a position of the given grid
    ///
    /// The position must be part of the grid.
    pub fn index_of(&self, grid: &Grid, position: Position) -> usize {
        let columns = grid.columns();

        match self {
            Wiring::RowMajor => position.row() * columns + position.col(),
            Wiring::Serpentine => {
                if position.row() % 2 == 0 {
                    position.row() * columns + position.col()
                } else {
                    position.row() * columns + (columns - 1 - position.col())
                }
            }
            Wiring::Table(table) => table[position.row() * columns + position.col()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct GridConfig {
    pub rows: usize,
    pub columns: usize,
    pub wiring: Wiring,
}

impl GridConfig {
    pub fn grid(&self) -> Grid {
        Grid::new(self.rows, self.columns)
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 5,
            columns: 5,
            wiring: Wiring::default(),
        }
    }
}

impl Validate for GridConfig {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.rows == 0 || self.rows > MAX_ROWS {
            errors.add("rows", ValidationError::new("range"));
        }

        // Cell indices must fit the LED index range of the devices
        let cells = self
            .rows
            .checked_mul(self.columns)
            .filter(|&cells| cells <= u32::MAX as usize);

        if self.columns == 0 || cells.is_none() {
            errors.add("columns", ValidationError::new("range"));
        }

        if let (Wiring::Table(table), Some(cells)) = (&self.wiring, cells) {
            if table.len() != cells {
                errors.add("wiring", ValidationError::new("table_length"));
            } else {
                let mut sorted = table.clone();
                sorted.sort_unstable();
                sorted.dedup();

                if sorted.len() != table.len() {
                    errors.add("wiring", ValidationError::new("table_duplicates"));
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Mapping from grid positions to physical LED indices
///
/// The grid and the LED strip are configured independently: cells that map past the end of
/// the strip have no LED.
#[derive(Debug, Clone, PartialEq)]
pub struct Addressing {
    grid: Grid,
    wiring: Wiring,
    led_count: usize,
}

impl Addressing {
    pub fn new(grid: Grid, wiring: Wiring, led_count: usize) -> Self {
        if grid.len() != led_count {
            warn!(
                cells = %grid.len(),
                leds = %led_count,
                "grid size and LED count differ, some cells or LEDs are unused"
            );
        }

        Self {
            grid,
            wiring,
            led_count,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    /// Physical LED index for a position, if the strip has a LED there
    pub fn led_index(&self, position: Position) -> Option<usize> {
        let index = self.wiring.index_of(&self.grid, self.grid.check(position).ok()?);
        (index < self.led_count).then(|| index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major() {
        let grid = Grid::new(3, 4);
        let wiring = Wiring::RowMajor;

        let indices: Vec<_> = grid.positions().map(|p| wiring.index_of(&grid, p)).collect();
        assert_eq!(indices, (0..12).collect::<Vec<_>>());
    }

    #[test]
    fn test_serpentine() {
        let grid = Grid::new(3, 4);
        let wiring = Wiring::Serpentine;

        let indices: Vec<_> = grid.positions().map(|p| wiring.index_of(&grid, p)).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 7, 6, 5, 4, 8, 9, 10, 11]);
    }

    #[test]
    fn test_table() {
        let grid = Grid::new(2, 2);
        let wiring = Wiring::Table(vec![3, 2, 0, 1]);

        assert_eq!(wiring.index_of(&grid, Position::new(0, 0)), 3);
        assert_eq!(wiring.index_of(&grid, Position::new(1, 1)), 1);
    }

    #[test]
    fn test_validate_table() {
        let mut config = GridConfig {
            rows: 2,
            columns: 2,
            wiring: Wiring::Table(vec![0, 1, 2]),
        };
        assert!(config.validate().is_err());

        config.wiring = Wiring::Table(vec![0, 1, 1, 2]);
        assert!(config.validate().is_err());

        config.wiring = Wiring::Table(vec![0, 1, 3, 2]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_grid_size() {
        let mut config = GridConfig {
            rows: 26,
            columns: usize::MAX / 2,
            wiring: Wiring::RowMajor,
        };
        assert!(config.validate().is_err());

        config.columns = u32::MAX as usize;
        assert!(config.validate().is_err());

        config.columns = 0;
        assert!(config.validate().is_err());

        config.columns = 1000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_led_index_drops_missing_leds() {
        let addressing = Addressing::new(Grid::new(5, 5), Wiring::RowMajor, 12);

        assert_eq!(addressing.led_index(Position::new(0, 0)), Some(0));
        assert_eq!(addressing.led_index(Position::new(2, 1)), Some(11));
        assert_eq!(addressing.led_index(Position::new(2, 2)), None);
        assert_eq!(addressing.led_index(Position::new(9, 0)), None);
    }
}

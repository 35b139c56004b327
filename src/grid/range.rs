use super::{Grid, GridError, Position};

/// Separator between the two ends of a range token, as in `A1-A4`
pub const RANGE_SEPARATOR: char = '-';

/// A single cell, or a run of cells between two positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionRange {
    Single(Position),
    Span(Position, Position),
}

impl PositionRange {
    /// Parse a position or range token against the given grid
    ///
    /// Whitespace around the token and around the separator is ignored.
    ///
    /// # Errors
    ///
    /// [GridError::MalformedRange] if there is more than one separator or one side of the
    /// separator is empty. Errors decoding either end are returned as-is.
    pub fn parse(grid: &Grid, token: &str) -> Result<Self, GridError> {
        let token = token.trim();
        let mut parts = token.split(RANGE_SEPARATOR).map(str::trim);

        match (parts.next(), parts.next(), parts.next()) {
            (Some(single), None, None) => Ok(Self::Single(grid.decode(single)?)),
            (Some(start), Some(end), None) => {
                if start.is_empty() || end.is_empty() {
                    return Err(GridError::MalformedRange(token.to_owned()));
                }

                Ok(Self::Span(grid.decode(start)?, grid.decode(end)?))
            }
            _ => Err(GridError::MalformedRange(token.to_owned())),
        }
    }

    /// Positions covered by this range
    ///
    /// Spans sharing a row cover all columns in between, spans sharing a column cover all
    /// rows in between, always in ascending order. Any other span only covers its two ends,
    /// in the order they were given.
    pub fn positions(&self) -> Vec<Position> {
        match *self {
            Self::Single(position) => vec![position],
            Self::Span(start, end) => {
                if start.row() == end.row() {
                    let (from, to) = ordered(start.col(), end.col());
                    (from..=to).map(|col| Position::new(start.row(), col)).collect()
                } else if start.col() == end.col() {
                    let (from, to) = ordered(start.row(), end.row());
                    (from..=to).map(|row| Position::new(row, start.col())).collect()
                } else {
                    vec![start, end]
                }
            }
        }
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if b < a {
        (b, a)
    } else {
        (a, b)
    }
}

impl Grid {
    /// Expand a position or range token into the positions it covers
    pub fn expand(&self, token: &str) -> Result<Vec<Position>, GridError> {
        Ok(PositionRange::parse(self, token)?.positions())
    }

    /// Expand a position or range token into the canonical tokens it covers
    pub fn expand_tokens(&self, token: &str) -> Result<Vec<String>, GridError> {
        Ok(self
            .expand(token)?
            .into_iter()
            .map(|position| position.to_string())
            .collect())
    }
}

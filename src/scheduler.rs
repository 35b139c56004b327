//! Highlight scheduling
//!
//! The [Scheduler] owns the state of every LED of the strip. Highlights light a set of LEDs
//! for a bounded time, and periodic calls to [Scheduler::tick] turn them off once their time
//! is up.
//!
//! Overlapping highlights are not merged: the last request targeting a LED replaces both its
//! color and its expiry.

use std::time::{Duration, Instant};

use serde_derive::{Deserialize, Serialize};

use crate::{
    grid::{Grid, GridError},
    models::{Addressing, Color},
};

/// Highlight duration when the request doesn't specify one
pub const DEFAULT_DURATION_SECS: u32 = 5;

/// Something a highlight request can point at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Target {
    /// Physical LED index
    Index(usize),
    /// Position or range token, e.g. `B2` or `A1-A4`
    Position(String),
}

impl From<&str> for Target {
    fn from(token: &str) -> Self {
        Self::Position(token.to_owned())
    }
}

impl From<usize> for Target {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HighlightRequest {
    pub targets: Vec<Target>,
    pub color: Color,
    pub duration_secs: u32,
}

impl HighlightRequest {
    pub fn new(targets: impl IntoIterator<Item = Target>, color: Color, duration_secs: u32) -> Self {
        Self {
            targets: targets.into_iter().collect(),
            color,
            duration_secs,
        }
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs as _)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellState {
    Idle,
    Lit { color: Color, expires_at: Instant },
}

impl Default for CellState {
    fn default() -> Self {
        Self::Idle
    }
}

/// State of a single LED
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct LedCell {
    state: CellState,
}

impl LedCell {
    pub fn state(&self) -> CellState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CellState::Lit { .. })
    }

    /// Current color of the LED, black when idle
    pub fn color(&self) -> Color {
        match self.state {
            CellState::Idle => Color::new(0, 0, 0),
            CellState::Lit { color, .. } => color,
        }
    }

    pub fn expires_at(&self) -> Option<Instant> {
        match self.state {
            CellState::Idle => None,
            CellState::Lit { expires_at, .. } => Some(expires_at),
        }
    }

    fn light(&mut self, color: Color, expires_at: Instant) {
        self.state = CellState::Lit { color, expires_at };
    }

    fn clear(&mut self) -> bool {
        std::mem::take(&mut self.state) != CellState::Idle
    }
}

/// Result of an applied highlight request
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightOutcome {
    /// Indices of the LEDs that were lit, in request order
    pub indices: Vec<usize>,
    pub color: Color,
    pub expires_at: Instant,
}

/// Read-only summary of the scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerStatus {
    pub led_count: usize,
    pub active_leds: usize,
    pub grid: Grid,
}

pub struct Scheduler {
    addressing: Addressing,
    cells: Vec<LedCell>,
}

impl Scheduler {
    pub fn new(addressing: Addressing) -> Self {
        let cells = vec![LedCell::default(); addressing.led_count()];

        Self { addressing, cells }
    }

    pub fn cells(&self) -> &[LedCell] {
        &self.cells
    }

    /// Current color of every LED, in strip order
    pub fn led_data(&self) -> impl Iterator<Item = Color> + '_ {
        self.cells.iter().map(LedCell::color)
    }

    /// Resolve highlight targets to LED indices
    ///
    /// Range tokens are expanded, duplicates are removed (first occurrence wins) and indices
    /// past the end of the strip are dropped.
    ///
    /// # Errors
    ///
    /// The first token that fails to parse aborts the whole resolution.
    pub fn resolve(&self, targets: &[Target]) -> Result<Vec<usize>, GridError> {
        let led_count = self.cells.len();
        let mut seen = vec![false; led_count];
        let mut indices = Vec::new();

        let mut push = |index: usize| {
            if index < led_count {
                if !std::mem::replace(&mut seen[index], true) {
                    indices.push(index);
                }
            } else {
                debug!(index = %index, led_count = %led_count, "dropping LED index past the end of the strip");
            }
        };

        for target in targets {
            match target {
                Target::Index(index) => push(*index),
                Target::Position(token) => {
                    for position in self.addressing.grid().expand(token)? {
                        match self.addressing.led_index(position) {
                            Some(index) => push(index),
                            None => {
                                debug!(position = %position, "no LED wired at position");
                            }
                        }
                    }
                }
            }
        }

        Ok(indices)
    }

    /// Light the LEDs targeted by a request until `now + duration`
    ///
    /// The request is fully resolved before any LED is touched, so an invalid request leaves
    /// the state unchanged.
    pub fn highlight(
        &mut self,
        request: &HighlightRequest,
        now: Instant,
    ) -> Result<HighlightOutcome, GridError> {
        let indices = self.resolve(&request.targets)?;
        let expires_at = now + request.duration();

        for &index in &indices {
            self.cells[index].light(request.color, expires_at);
        }

        trace!(
            leds = %indices.len(),
            duration = %request.duration_secs,
            "applied highlight"
        );

        Ok(HighlightOutcome {
            indices,
            color: request.color,
            expires_at,
        })
    }

    /// Turn every LED off, regardless of pending expiries
    ///
    /// Returns the number of LEDs that were lit.
    pub fn turn_off_all(&mut self) -> usize {
        self.cells.iter_mut().map(LedCell::clear).filter(|&cleared| cleared).count()
    }

    /// Turn off the LEDs whose highlight has expired at `now`
    ///
    /// Returns the number of LEDs that were turned off.
    pub fn tick(&mut self, now: Instant) -> usize {
        let mut expired = 0;

        for cell in &mut self.cells {
            if let CellState::Lit { expires_at, .. } = cell.state {
                if expires_at <= now {
                    cell.clear();
                    expired += 1;
                }
            }
        }

        expired
    }

    pub fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            led_count: self.cells.len(),
            active_leds: self.cells.iter().filter(|cell| cell.is_active()).count(),
            grid: *self.addressing.grid(),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("grid", self.addressing.grid())
            .field("led_count", &self.cells.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Wiring;

    const RED: Color = Color::new(255, 0, 0);
    const BLUE: Color = Color::new(0, 0, 255);

    fn scheduler() -> Scheduler {
        Scheduler::new(Addressing::new(Grid::new(5, 5), Wiring::RowMajor, 25))
    }

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn request(targets: &[&str], color: Color, duration_secs: u32) -> HighlightRequest {
        HighlightRequest::new(targets.iter().map(|&t| Target::from(t)), color, duration_secs)
    }

    #[test]
    fn test_initial_state() {
        let scheduler = scheduler();

        assert_eq!(scheduler.cells().len(), 25);
        assert!(scheduler.cells().iter().all(|cell| *cell == LedCell::default()));
        assert!(scheduler.led_data().all(|c| c == Color::new(0, 0, 0)));
    }

    #[test]
    fn test_highlight_then_expire() {
        let mut scheduler = scheduler();
        let t = Instant::now();

        let outcome = scheduler.highlight(&request(&["A1"], RED, 5), t).unwrap();
        assert_eq!(outcome.indices, vec![0]);

        let cell = scheduler.cells()[0];
        assert_eq!(
            cell.state(),
            CellState::Lit {
                color: RED,
                expires_at: t + secs(5)
            }
        );

        // Not yet expired
        assert_eq!(scheduler.tick(t + secs(4)), 0);
        assert!(scheduler.cells()[0].is_active());

        assert_eq!(scheduler.tick(t + secs(6)), 1);
        assert_eq!(scheduler.cells()[0].state(), CellState::Idle);
        assert_eq!(scheduler.cells()[0].color(), Color::new(0, 0, 0));
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let mut scheduler = scheduler();
        let t = Instant::now();

        scheduler.highlight(&request(&["B2"], RED, 3), t).unwrap();
        assert_eq!(scheduler.tick(t + secs(3)), 1);
    }

    #[test]
    fn test_zero_duration_expires_on_next_tick() {
        let mut scheduler = scheduler();
        let t = Instant::now();

        scheduler.highlight(&request(&["C3"], RED, 0), t).unwrap();
        assert_eq!(scheduler.status().active_leds, 1);
        assert_eq!(scheduler.tick(t), 1);
        assert_eq!(scheduler.status().active_leds, 0);
    }

    #[test]
    fn test_no_tick_no_expiry() {
        let mut scheduler = scheduler();
        let t = Instant::now();

        scheduler.highlight(&request(&["A1-A5"], RED, 1), t).unwrap();
        assert_eq!(scheduler.status().active_leds, 5);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut scheduler = scheduler();
        let t = Instant::now();

        scheduler.highlight(&request(&["A1"], RED, 10), t).unwrap();
        scheduler
            .highlight(&request(&["A1"], BLUE, 2), t + secs(1))
            .unwrap();

        assert_eq!(
            scheduler.cells()[0].state(),
            CellState::Lit {
                color: BLUE,
                expires_at: t + secs(3)
            }
        );

        // The first request's expiry doesn't bring the red color back
        for s in 1..12 {
            scheduler.tick(t + secs(s));
            assert_ne!(scheduler.cells()[0].color(), RED);
        }

        assert!(!scheduler.cells()[0].is_active());
    }

    #[test]
    fn test_overlapping_ranges_only_override_shared_cells() {
        let mut scheduler = scheduler();
        let t = Instant::now();

        scheduler.highlight(&request(&["A1-A3"], RED, 10), t).unwrap();
        scheduler.highlight(&request(&["A3-A5"], BLUE, 2), t).unwrap();

        let colors: Vec<_> = scheduler.led_data().take(5).collect();
        assert_eq!(colors, vec![RED, RED, BLUE, BLUE, BLUE]);

        scheduler.tick(t + secs(2));
        let colors: Vec<_> = scheduler.led_data().take(5).collect();
        let off = Color::new(0, 0, 0);
        assert_eq!(colors, vec![RED, RED, off, off, off]);
    }

    #[test]
    fn test_turn_off_all() {
        let mut scheduler = scheduler();
        let t = Instant::now();

        scheduler.highlight(&request(&["A1-E1"], RED, 100), t).unwrap();
        scheduler.highlight(&request(&["C2-C4"], BLUE, 1), t).unwrap();
        assert_eq!(scheduler.status().active_leds, 8);

        assert_eq!(scheduler.turn_off_all(), 8);
        assert!(scheduler.cells().iter().all(|cell| !cell.is_active()));
        let once = scheduler.cells().to_vec();

        assert_eq!(scheduler.turn_off_all(), 0);
        assert_eq!(scheduler.cells(), &once[..]);
    }

    #[test]
    fn test_rejected_requests_have_no_effect() {
        let mut scheduler = scheduler();
        let t = Instant::now();

        scheduler.highlight(&request(&["B1-B3"], RED, 10), t).unwrap();
        let before = scheduler.cells().to_vec();

        for (tokens, expected) in &[
            (vec!["A1-"], "range"),
            (vec!["1A"], "token"),
            (vec!["Z9"], "range_bounds"),
            (vec!["D1", "D2", "1A"], "token"),
            (vec!["D1-D3", "A1--A2"], "range"),
        ] {
            let result = scheduler.highlight(&request(tokens, BLUE, 5), t + secs(1));

            match (*expected, result) {
                ("range", Err(GridError::MalformedRange(_))) => {}
                ("token", Err(GridError::MalformedToken(_))) => {}
                ("range_bounds", Err(GridError::OutOfRange { .. })) => {}
                (expected, other) => panic!("{:?}: expected {}, got {:?}", tokens, expected, other),
            }

            assert_eq!(scheduler.cells(), &before[..]);
        }
    }

    #[test]
    fn test_resolve_dedups_and_drops_out_of_range() {
        let scheduler = Scheduler::new(Addressing::new(Grid::new(5, 5), Wiring::RowMajor, 12));

        let indices = scheduler
            .resolve(&[
                Target::from("A1-A3"),
                Target::from("A2"),
                Target::from(40),
                Target::from(11),
                Target::from("E5"),
                Target::from("C1-C3"),
            ])
            .unwrap();

        assert_eq!(indices, vec![0, 1, 2, 11, 10]);
    }

    #[test]
    fn test_resolve_keeps_diagonal_endpoint_order() {
        let scheduler = scheduler();

        assert_eq!(
            scheduler.resolve(&[Target::from("B3-A1")]).unwrap(),
            vec![7, 0]
        );
        assert_eq!(
            scheduler.resolve(&[Target::from("A3-A1")]).unwrap(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_resolve_with_serpentine_wiring() {
        let scheduler = Scheduler::new(Addressing::new(Grid::new(2, 3), Wiring::Serpentine, 6));

        assert_eq!(
            scheduler.resolve(&[Target::from("B1-B3")]).unwrap(),
            vec![5, 4, 3]
        );
    }

    #[test]
    fn test_status_is_read_only() {
        let mut scheduler = scheduler();
        let t = Instant::now();

        scheduler.highlight(&request(&["A1", "B2"], RED, 0), t).unwrap();
        let before = scheduler.cells().to_vec();

        let status = scheduler.status();
        assert_eq!(status.led_count, 25);
        assert_eq!(status.active_leds, 2);
        assert_eq!(status.grid, Grid::new(5, 5));
        assert_eq!(scheduler.cells(), &before[..]);
    }
}

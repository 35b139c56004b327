//! `gridlight` drives an addressable LED strip laid out over a storage grid.
//!
//! Grid cells are named with a row letter and a column number (`A1`, `C4`, ...), and runs of
//! cells with range tokens such as `A1-A4`. Clients ask for a set of cells to be highlighted
//! for a few seconds through line-delimited JSON over TCP or through HTTP, and a single
//! controller task owns the LED state and turns highlights off once they expire.

#[macro_use]
extern crate tracing;

pub mod api;
pub mod color;
pub mod global;
pub mod grid;
pub mod instance;
pub mod models;
pub mod scheduler;
pub mod serde;
pub mod servers;
pub mod web;

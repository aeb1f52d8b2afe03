//! Book layout calculation
//!
//! This module groups the flat page sequence into openings for a page-flip
//! presentation:
//! - Pairing pages into openings, optionally in covers-facing order
//! - Locating the opening that shows a page
//! - Describing a turn from one opening to another

mod book;
mod flip;

pub use book::*;
pub use flip::*;

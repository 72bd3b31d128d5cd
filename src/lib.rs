//! Simple cli for tracking time spent on named tasks. Start and stop a live
//! stopwatch, back-fill entries manually, and review history by day or by
//! task, all from a terminal.
//!

pub mod cli;
pub mod engine;
pub mod utils;

//! Native harness for the inspect highlighter engine.
//!
//! Replays recorded scenarios (a document fixture plus a list of steps)
//! through an inspector session over [`inspect::memory::MemoryDom`] and
//! reports every decision the session made.

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod output;
pub mod replay;
pub mod scenario;
pub mod scheduler;

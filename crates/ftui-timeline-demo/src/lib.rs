#![forbid(unsafe_code)]

//! Headless harness for the FrankenTUI timeline engine.
//!
//! Loads a fixture (or synthesizes one), scrolls a
//! [`Timeline`](ftui_timeline::Timeline) from top to bottom and back on a
//! simulated clock, and writes one JSONL record per tick.

pub mod cli;
pub mod fixture;
pub mod harness;

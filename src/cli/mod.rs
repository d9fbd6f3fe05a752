//! Command Line Interface (CLI) layer for EOPR.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) for the header, band, bitmask
//! and swap-endian subcommands. It wires user-provided options to the
//! underlying library functionality exposed via `eopr::api`.
//!
//! If you are embedding EOPR into another application, prefer using
//! the high-level `eopr::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;

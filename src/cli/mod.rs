//! Handles Command Line Interface (CLI) related functionalities.
//!
//! Includes argument parsing and dispatch (`commands`), the interactive prompt loop
//! (`interactive`) and terminal rendering of readings and reports (`display`).

mod commands;
mod display;
mod interactive;

pub use commands::*;

//! Invocation of the libwebp tools.
//!
//! - `runner`: spawns one tool process and captures its output
//! - `wrapper`: `BinWrapper`, which provisions lazily and then runs tools

pub mod runner;
pub mod wrapper;

pub use runner::{execute, strip_line_breaks, ProcessOutput};
pub use wrapper::BinWrapper;

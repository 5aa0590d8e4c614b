//! Library for the seqid CLI: command implementations and output helpers.

pub mod commands;
pub mod output;

pub use commands::Session;
pub use output::OutputFormat;

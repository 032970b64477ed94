//! CLI subcommands

pub mod check;
pub mod predict;
pub mod status;

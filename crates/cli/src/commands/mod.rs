//! CLI subcommand implementations

pub mod curve;
pub mod inspect;
pub mod windows;

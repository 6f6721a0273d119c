//! SMS Search CLI library: dependency wiring and subcommands

pub mod app;
pub mod commands;

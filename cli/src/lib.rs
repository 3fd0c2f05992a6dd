//! Operator CLI over the toolshelf directory store.

pub mod cli;
pub mod commands;
pub mod utils;

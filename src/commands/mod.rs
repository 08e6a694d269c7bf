//! Top-level commands

pub mod archive;

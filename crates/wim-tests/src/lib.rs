//! Test utilities for the `wim-rs` workspace.

pub mod binrw;

//! Workspace placeholder crate.
//!
//! This crate exists to expose shared feature flags that map to the
//! individual workspace crates. Host applications can depend on
//! `dsc-workspace` with the `sync` feature enabled instead of wiring the
//! `core-sync`, `core-runtime`, and `bridge-traits` crates individually.

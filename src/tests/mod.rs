//! tests/mod.rs

// src/storage/mod.rs
pub mod artifacts;
pub mod blacklist;
pub mod registry;

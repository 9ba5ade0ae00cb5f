// src/core/identity/mod.rs
pub mod quality;
pub mod scoring;
pub mod types;

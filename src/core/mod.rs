// src/core/mod.rs
pub mod engines;
pub mod identity;
pub mod services;

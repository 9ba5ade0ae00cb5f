// src/api/handlers/mod.rs
pub mod document;
pub mod health;
pub mod review;
pub mod verification;

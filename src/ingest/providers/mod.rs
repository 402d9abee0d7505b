// src/ingest/providers/mod.rs
pub mod dshield;
pub mod newsapi;

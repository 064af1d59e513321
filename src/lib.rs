// src/lib.rs
pub mod broadcast;
pub mod config;
pub mod monitor;
pub mod probe;
pub mod reconcile;
pub mod registry;
pub mod server;
pub mod snapshot;

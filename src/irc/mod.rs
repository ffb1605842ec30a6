//! IRC connection layer: transport, per-session engine, stable wrapper and
//! reconnection.

pub mod commands;
pub mod connection;
pub mod identity;
pub mod manager;
pub mod transport;
pub mod wrapper;

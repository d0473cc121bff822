//! API layer for stopping-daemon

pub mod rest;

pub use rest::router::create_router;

//! Client for the stopping daemon
//!
//! Wraps the daemon's REST surface: health, status and the token protected
//! pod listing and deletion calls an instance makes about itself.

pub mod client;
pub mod error;

pub use client::{DaemonStatus, Health, StoppingClient};
pub use error::{ClientError, ClientResult};

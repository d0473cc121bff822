//! API request handlers

mod health;
mod kubernetes;

pub use health::*;
pub use kubernetes::*;

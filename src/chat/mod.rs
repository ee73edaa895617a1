//! Chat completion endpoint integration

mod client;
mod types;

pub use client::*;
pub use types::*;

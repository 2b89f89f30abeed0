pub mod client;
pub mod error;
pub mod types;

pub use client::{ChainRpc, Client};
pub use error::Error;

pub mod chain_client;
pub mod chain_follower;
pub mod config;
pub mod controller;
pub mod database;
pub mod host;
pub mod logging;
pub mod merkle;
pub mod retry;
pub mod stopper;
pub mod storage;
pub mod store;
pub mod types;
pub mod utils;

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[clap(
    version = "0.1.0",
    about = "silod",
    long_about = r#"silod is a storage-provider host daemon: it rents out disk space under
blockchain-anchored file contracts and submits periodic storage proofs to
collect the contract payouts."#
)]
pub struct Config {
    #[clap(
        long,
        env = "CHAIN_RPC_URL",
        help = "URL of the consensus daemon RPC server (e.g., http://localhost:9980)"
    )]
    pub chain_rpc_url: String,

    #[clap(
        long,
        env = "CHAIN_RPC_USER",
        help = "User for consensus daemon RPC authentication"
    )]
    pub chain_rpc_user: String,

    #[clap(
        long,
        env = "CHAIN_RPC_PASSWORD",
        help = "Password for consensus daemon RPC authentication"
    )]
    pub chain_rpc_password: String,

    #[clap(
        long,
        env = "DATA_DIR",
        help = "Directory path for stored contract data (e.g., /var/lib/silod/data)"
    )]
    pub data_dir: PathBuf,

    #[clap(
        long,
        env = "DATABASE_DIR",
        help = "Directory path for the obligation database (e.g., /var/lib/silod/db)"
    )]
    pub database_dir: PathBuf,

    #[clap(
        long,
        env = "STORAGE_CAPACITY",
        help = "Total bytes offered for rent (e.g., 10737418240)",
        default_value = "10737418240"
    )]
    pub storage_capacity: u64,

    #[clap(
        long,
        env = "PROOF_INTERVAL",
        help = "Blocks between periodic storage proofs on a single contract",
        default_value = "100"
    )]
    pub proof_interval: u64,

    #[clap(
        long,
        env = "POLL_INTERVAL_SECS",
        help = "Seconds between chain tip polls",
        default_value = "5"
    )]
    pub poll_interval_secs: u64,

    #[clap(
        long,
        env = "STARTING_BLOCK_HEIGHT",
        help = "Block height to begin following at when no chain state is persisted",
        default_value = "0"
    )]
    pub starting_block_height: u64,

    #[clap(
        long,
        env = "PRUNE_FORFEITED",
        help = "Delete stored data when an obligation is forfeited; keep it for dispute resolution otherwise",
        default_value_t = true,
        action = clap::ArgAction::Set
    )]
    pub prune_forfeited: bool,
}

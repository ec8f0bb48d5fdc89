//! Common Test Utilities
//!
//! Mock providers and transaction fixtures shared by the unit and
//! integration trees. Nothing here touches the network.
#![allow(dead_code)]

pub mod fixtures;
pub mod providers;

pub const SOURCE_ADDRESS: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
pub const SOURCE_SCRIPT: &str = "0014751e76e8199196d454941c45d1b3a323f1433bd6";
pub const LEGACY_ADDRESS: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";
pub const LEGACY_SCRIPT: &str = "76a914751e76e8199196d454941c45d1b3a323f1433bd688ac";
pub const TESTNET_ADDRESS: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

//! OAuth2 core: error taxonomy, requests, token strategies, storage contract and
//! the grant handler chain.

pub mod error;
pub mod arguments;
pub mod scope;
pub mod types;
pub mod session;
pub mod request;
pub mod response;
pub mod crypto;
pub mod hash;
pub mod strategy;
pub mod storage;
pub mod memory;
pub mod handler;
pub mod introspector;
pub mod revocation;
pub mod provider;
pub mod config;
pub mod compose;

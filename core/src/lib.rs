pub mod account;
pub mod backoff;
pub mod chain;
pub mod classify;
pub mod error;
pub mod rpc_clients;

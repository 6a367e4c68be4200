pub mod config;
pub mod contracts;
pub mod runner;
pub mod session;
pub mod steps;
pub mod wallets;

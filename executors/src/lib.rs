pub mod events;
pub mod gas;
pub mod nonce;
pub mod pending;
pub mod submitter;

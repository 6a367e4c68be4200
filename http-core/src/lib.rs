pub mod captcha;
pub mod client;
pub mod error;
pub mod faucet;
pub mod proxy;
pub mod storage;

pub mod chain_rpc;
pub mod transport;

pub use chain_rpc::{ChainRpc, ReceiptSummary, TransactionView, TxPoolStatus};

pub mod compliance;
pub mod config;
pub mod dedup;
pub mod deps;
pub mod ingest;
pub mod lock;
pub mod log;
pub mod pipeline;
pub mod promotion;
pub mod qg_error;
pub mod selector;
pub mod similarity;
pub mod stall;
pub mod storage;
pub mod store;
pub mod types;
pub mod unblock;

pub mod collections;
pub mod config;
pub mod error;
pub mod gateway;
pub mod locks;
pub mod server;
pub mod storage;

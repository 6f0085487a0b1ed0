pub mod app;
pub mod config;
pub mod crawler;
pub mod filter;
pub mod monitor;
pub mod notifier;
pub mod phone;
pub mod storage;

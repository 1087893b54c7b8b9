pub mod chat;
pub mod config;
pub mod task;
pub mod utils;

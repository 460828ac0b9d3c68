pub mod assets;
pub mod cache;
pub mod catalog;
pub mod config;

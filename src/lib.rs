pub mod canvas;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod notion;
pub mod retry;
pub mod services;
pub mod sync;

pub mod config;
pub mod logging;

pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod job;
pub mod library;
pub mod preset;
pub mod progress;
pub mod service;

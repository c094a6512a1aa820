pub mod calendar;
pub mod config;
pub mod error;
pub mod predictor;
pub mod prize;
pub mod rules;
pub mod service;
pub mod simulator;
pub mod stats;
pub mod ticket;

pub use error::CoreError;
pub use service::Analyzer;

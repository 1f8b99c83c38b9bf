//! Delivery job tracking: a dispatch lifecycle that records when each
//! milestone happened, bulk CSV upload with unique references, and live ETAs
//! from a routing provider.

pub mod cli;
pub mod config;
pub mod error;
pub mod eta;
pub mod ingest;
pub mod lifecycle;
pub mod service;
pub mod store;
pub mod ui;

pub use error::{DispatchError, ErrorKind};
pub use service::JobService;

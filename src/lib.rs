// Crate root library declaration and module exports.
pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod logging;
pub mod model;
pub mod sanitize;
pub mod service;
pub mod storage;

pub use client::RemoteGateway;
pub use model::{Dataset, Event, HelpService, ItemKind};
pub use service::{DataService, PushReport, ServiceError};

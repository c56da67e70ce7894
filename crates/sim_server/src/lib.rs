//! # Sim Verification Server
//!
//! Server-side anti-cheat for Bastion Defense sessions.
//!
//! Clients play locally and submit one segment (5 waves) at a time. The
//! server replays each segment from its stored resume point with the same
//! engine build, compares the chained checkpoint hashes and answers with
//! `{accepted, rejectionReason?}`. It never renders anything.
//!
//! Each replay is single-threaded; many sessions verify in parallel on a
//! bounded pool of blocking workers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod service;
pub mod store;

pub use config::ServerConfig;
pub use dispatch::Dispatcher;
pub use error::{Result, ServerError};
pub use protocol::{Request, Response};
pub use service::VerificationService;
pub use store::SessionStore;

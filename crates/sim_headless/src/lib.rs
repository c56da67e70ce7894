//! Headless session runner for autopilot play and CI verification.
//!
//! Plays Bastion Defense sessions without any client, driven by a scripted
//! [`Autopilot`]. This enables:
//!
//! - **Recording**: produce the exact segment submissions a client would send
//! - **Local verification**: run them through the server's verifier
//! - **Determinism checks**: replay many seeds in parallel and compare hashes
//! - **Balance sweeps**: summarize how far a strategy gets across seeds
//!
//! # Example
//!
//! ```bash
//! # Play one session and save its submissions
//! cargo run -p sim_headless -- play --seed 42 --output session.json
//!
//! # Verify a recording
//! cargo run -p sim_headless -- verify --input session.json
//!
//! # Check determinism across 200 seeds
//! cargo run -p sim_headless -- determinism --count 200
//! ```

pub mod batch;
pub mod error;
pub mod metrics;
pub mod runner;
pub mod strategies;
pub mod verify;

pub use batch::{check_determinism, run_batch, BatchConfig, BatchResults, DeterminismReport};
pub use error::{HeadlessError, Result};
pub use metrics::{BatchSummary, SessionMetrics};
pub use runner::{HeadlessRunner, SessionRecording, SessionRun};
pub use strategies::{Autopilot, Strategy};
pub use verify::{verify_recording, FullAudit, SegmentReport};

//! Driving a workflow engine: a retry-less REST client and replay of
//! reconstructed traces as task claims.

pub mod client;
pub mod replay;

pub use client::RestEngineClient;
pub use replay::{execute_trace, replay_trace, ReplayReport};

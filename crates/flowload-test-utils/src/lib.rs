//! Shared fixtures and mocks for flowload tests.

pub mod fixtures;
pub mod mock_engine;

pub use mock_engine::{EngineCall, MockEngine};

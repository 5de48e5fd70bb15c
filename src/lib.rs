// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod ai;
pub mod api;
pub mod auth;
pub mod bootstrap;
pub mod config;
pub mod dosha;
pub mod emergency;
pub mod fallback;
pub mod matching;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod remedy;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::pipeline::{Pipeline, QueryOutcome};
pub use crate::remedy::{Language, RemedyAnswer};

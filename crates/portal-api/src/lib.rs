//! Portal application layer over the grievance lifecycle engine.
//!
//! Provides the abstract HTTP surface (status-code mapping and response
//! envelopes), the urgency-scorer clients, configuration loading, and the
//! optional periodic SLA sweep. The binary in `main.rs` wires these to a
//! stdio JSON request loop.

pub mod api;
pub mod config;
pub mod scorer;
pub mod sweep;

pub use api::{ApiResponse, PortalApi, Request};
pub use config::{PortalConfig, ScorerConfig};
pub use scorer::{HeuristicScorer, OpenAiScorer};

//! Routing helpers: query construction for the oracle, validation of its
//! answer, and the local keyword heuristic used as a fallback.

pub mod confidence;
pub mod matcher;
pub mod query;

pub use confidence::KeywordConfidence;
pub use matcher::{match_handler, normalize_oracle_output};
pub use query::RoutingQuery;

use serde::Serialize;

/// Which path produced a routing decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// The oracle's first answer matched a handler.
    Oracle,
    /// The constrained retry query matched a handler.
    StrictRetry,
    /// The oracle failed or never matched; the best local confidence won.
    ConfidenceFallback,
}

/// Outcome of the routing phase of a single dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutingDecision {
    pub selected: String,
    /// Last text received from the oracle; empty if it never answered.
    pub raw_oracle_output: String,
    pub source: RouteSource,
}

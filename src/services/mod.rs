/// Majority voting for skip and hint.
pub mod consensus;
/// OpenAPI documentation generation.
pub mod documentation;
/// In-process worker fleet and guild routing.
pub mod fleet;
/// Gateway event handling routed to the owning worker.
pub mod gateway_service;
/// Guess normalisation and matching.
pub mod guess;
/// Health check service.
pub mod health_service;
/// Engine notifications and their SSE sink.
pub mod outbox;
/// Read-only session and stats projections.
pub mod public_service;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Fleet-wide stats aggregation.
pub mod stats;
/// Per-worker session event loop.
pub mod worker;

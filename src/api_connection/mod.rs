pub mod connection;
pub mod endpoints;

pub use connection::{ScoringApi, ScoringApiError};
pub use endpoints::{InteractionCheckRequest, InteractionReport};

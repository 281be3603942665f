pub mod api_connection;
pub mod cli;
pub mod additive_normalizer;
pub mod additive_extractor;
pub mod routine_aggregator;
pub mod routine_loader;
pub mod what_if;
pub mod interaction_checker;
pub mod report_presenter;

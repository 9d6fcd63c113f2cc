// Infrastructure layer - External dependencies and adapters
pub mod background_worker;
pub mod config;
pub mod http_aggregator;
pub mod http_response;
pub mod ndjson_stream;

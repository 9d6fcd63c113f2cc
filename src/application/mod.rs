// Application layer - Data pipeline, dispatch and session state
pub mod dashboard_session;
pub mod dispatcher;
pub mod filter_aggregator;
pub mod frame_monitor;
pub mod processing_context;
pub mod reconciler;
pub mod series_generator;
pub mod stream_buffer;
pub mod stream_driver;
pub mod virtual_window;

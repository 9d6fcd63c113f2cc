// Presentation layer - HTTP host around the dashboard session
pub mod app_state;
pub mod handlers;
pub mod router;

// Domain layer - Plain data shared by every other layer
pub mod metrics;
pub mod point;

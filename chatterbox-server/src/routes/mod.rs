pub mod messages;
pub mod metrics;

pub mod ids;
pub mod throttle;

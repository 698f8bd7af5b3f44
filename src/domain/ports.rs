// Port for retrieving the current time as epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> f64;
}

use std::time::Duration;

/// Monotonic time source used to pace capture.
///
/// `now` is measured from an arbitrary fixed origin; only differences
/// are meaningful.
pub trait Clock: Send {
    fn now(&self) -> Duration;

    fn sleep(&self, duration: Duration);

    /// Sleeps until `deadline` if it lies in the future.
    fn sleep_until(&self, deadline: Duration) {
        let now = self.now();
        if deadline > now {
            self.sleep(deadline - now);
        }
    }
}

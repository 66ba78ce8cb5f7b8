use chrono::NaiveDateTime;

/// Time source used to decide which assignments have already lapsed.
pub trait Clock: Send + Sync {
    /// Returns the current time in the store's timezone.
    fn now(&self) -> NaiveDateTime;
}

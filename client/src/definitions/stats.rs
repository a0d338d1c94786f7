/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total `resolve` calls
    pub lookups: u64,
    /// Lookups answered from resident entries
    pub hits: u64,
    /// Lookups that had to wait on a fetch
    pub misses: u64,
    /// Fetches started; concurrent misses on one id share a single fetch
    pub fetches: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

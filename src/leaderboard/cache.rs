//! Short-lived read cache for the public leaderboard
//!
//! Best effort only: it may serve rows up to one TTL old and is never read by
//! the upsert path. Callers pass `now` so expiry is testable.

use std::time::{Duration, Instant};

use super::store::LeaderboardRow;

#[derive(Debug)]
pub struct LeaderboardCache {
    ttl: Duration,
    filled: Option<(Instant, Vec<LeaderboardRow>)>,
}

impl LeaderboardCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, filled: None }
    }

    /// Cached rows, if fresh and holding at least `limit` of them
    pub fn get(&self, limit: usize, now: Instant) -> Option<Vec<LeaderboardRow>> {
        let (at, rows) = self.filled.as_ref()?;
        if now.saturating_duration_since(*at) >= self.ttl || rows.len() < limit {
            return None;
        }
        Some(rows[..limit].to_vec())
    }

    pub fn put(&mut self, rows: Vec<LeaderboardRow>, now: Instant) {
        self.filled = Some((now, rows));
    }

    pub fn invalidate(&mut self) {
        self.filled = None;
    }

    pub fn is_warm(&self, now: Instant) -> bool {
        self.filled
            .as_ref()
            .is_some_and(|(at, _)| now.saturating_duration_since(*at) < self.ttl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: usize) -> Vec<LeaderboardRow> {
        (0..n)
            .map(|i| LeaderboardRow {
                nickname: format!("p{i}"),
                score: 100 - i as u64,
                level: 1,
                timestamp: 0,
            })
            .collect()
    }

    #[test]
    fn test_serves_fresh_rows() {
        let start = Instant::now();
        let mut cache = LeaderboardCache::new(Duration::from_secs(30));
        assert!(cache.get(1, start).is_none());

        cache.put(rows(5), start);
        let hit = cache.get(3, start + Duration::from_secs(10)).unwrap();
        assert_eq!(hit.len(), 3);
        assert_eq!(hit[0].nickname, "p0");
    }

    #[test]
    fn test_short_cache_is_a_miss() {
        let start = Instant::now();
        let mut cache = LeaderboardCache::new(Duration::from_secs(30));
        cache.put(rows(2), start);
        assert!(cache.get(3, start).is_none());
        assert!(cache.get(2, start).is_some());
    }

    #[test]
    fn test_expiry_and_invalidate() {
        let start = Instant::now();
        let mut cache = LeaderboardCache::new(Duration::from_secs(30));
        cache.put(rows(5), start);
        assert!(cache.is_warm(start + Duration::from_secs(29)));
        assert!(cache.get(1, start + Duration::from_secs(30)).is_none());

        cache.put(rows(5), start);
        cache.invalidate();
        assert!(!cache.is_warm(start));
    }
}

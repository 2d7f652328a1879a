use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// How long a resolved address is reused before the host is looked up again.
pub const DNS_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct DnsCacheEntry {
    ip_address: IpAddr,
    cached_at: Instant,
    ttl: Duration,
}

impl DnsCacheEntry {
    pub fn new(ip_address: IpAddr, ttl: Duration) -> Self {
        Self {
            ip_address,
            cached_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }

    pub fn ip_address(&self) -> IpAddr {
        self.ip_address
    }
}

#[derive(Debug, Default)]
pub struct DnsCache {
    cache: HashMap<String, DnsCacheEntry>,
}

impl DnsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hostname: String, ip_address: IpAddr) {
        self.cache
            .insert(hostname, DnsCacheEntry::new(ip_address, DNS_CACHE_TTL));
    }

    pub fn remove(&mut self, hostname: &str) {
        self.cache.remove(hostname);
    }

    /// Returns the cached address for `hostname`, dropping it first if it has expired.
    pub fn get_valid_ip(&mut self, hostname: &str) -> Option<IpAddr> {
        match self.cache.get(hostname) {
            Some(entry) if !entry.is_expired() => Some(entry.ip_address()),
            Some(_) => {
                self.remove(hostname);
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_address_is_returned_until_removed() {
        let mut cache = DnsCache::new();
        let ip: IpAddr = "1.1.1.1".parse().unwrap();
        cache.insert("one.one.one.one".to_string(), ip);

        assert_eq!(cache.get_valid_ip("one.one.one.one"), Some(ip));

        cache.remove("one.one.one.one");
        assert_eq!(cache.get_valid_ip("one.one.one.one"), None);
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let mut cache = DnsCache::new();
        let ip: IpAddr = "1.1.1.1".parse().unwrap();
        cache.cache.insert(
            "stale.example".to_string(),
            DnsCacheEntry::new(ip, Duration::ZERO),
        );
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.get_valid_ip("stale.example"), None);
        assert!(cache.cache.is_empty());
    }
}

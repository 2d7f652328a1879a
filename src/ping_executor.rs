use std::future::Future;
use std::net::IpAddr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use chrono::Local;
use surge_ping::{Client, Config, ICMP, IcmpPacket, PingIdentifier, PingSequence, SurgeError};

use crate::dns_cache::DnsCache;
use crate::probe::{ProbeError, ProbeGateway, ProbeOutcome};

/// Sanitize hostname by keeping only valid characters (alphanumeric, dots, hyphens)
/// Returns None if the result is empty
fn sanitize_hostname(hostname: &str) -> Option<String> {
    // Also handle case where user included port like "example.com:8080"
    let hostname = hostname.split(':').next().unwrap_or(hostname);

    let sanitized: String = hostname
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '-')
        .collect();

    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

/// Parses literal IPv4/IPv6 addresses, with or without `[]` around IPv6.
fn parse_ip_literal(target: &str) -> Option<IpAddr> {
    let target = target
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(target);
    target.parse().ok()
}

/// Runs `attempt` but gives up with [`ProbeError::Timeout`] once `timeout` has passed.
async fn within<F>(timeout: Duration, attempt: F) -> Result<Duration, ProbeError>
where
    F: Future<Output = Result<Duration, ProbeError>>,
{
    tokio::time::timeout(timeout, attempt)
        .await
        .unwrap_or(Err(ProbeError::Timeout))
}

/// Probe gateway backed by ICMP echo requests.
pub struct PingExecutor {
    dns_cache: Mutex<DnsCache>,
    sequence: AtomicU16,
}

impl Default for PingExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl PingExecutor {
    pub fn new() -> Self {
        Self {
            dns_cache: Mutex::new(DnsCache::new()),
            sequence: AtomicU16::new(0),
        }
    }

    /// Resolve hostname to IP address, consulting the cache first
    async fn resolve_target(&self, target: &str) -> Result<IpAddr, ProbeError> {
        if let Some(ip) = parse_ip_literal(target) {
            return Ok(ip);
        }

        let sanitized =
            sanitize_hostname(target).ok_or_else(|| ProbeError::Resolve(target.to_string()))?;

        if let Some(ip) = self.cached_ip(&sanitized) {
            return Ok(ip);
        }

        let ip = tokio::net::lookup_host(format!("{sanitized}:0"))
            .await
            .map_err(|e| ProbeError::Resolve(format!("{sanitized}: {e}")))?
            .next()
            .map(|addr| addr.ip())
            .ok_or_else(|| ProbeError::Resolve(sanitized.clone()))?;

        if let Ok(mut cache) = self.dns_cache.lock() {
            cache.insert(sanitized, ip);
        }
        Ok(ip)
    }

    fn cached_ip(&self, hostname: &str) -> Option<IpAddr> {
        self.dns_cache
            .lock()
            .ok()
            .and_then(|mut cache| cache.get_valid_ip(hostname))
    }

    fn forget(&self, target: &str) {
        if let (Some(hostname), Ok(mut cache)) = (sanitize_hostname(target), self.dns_cache.lock())
        {
            cache.remove(&hostname);
        }
    }

    /// Execute the actual ping operation
    async fn execute_ping(&self, target_ip: IpAddr, timeout: Duration) -> Result<Duration, ProbeError> {
        let config = match target_ip {
            IpAddr::V4(_) => Config::default(),
            IpAddr::V6(_) => Config::builder().kind(ICMP::V6).build(),
        };
        let client = Client::new(&config).map_err(|e| ProbeError::Transport(e.to_string()))?;

        let identifier = PingIdentifier(std::process::id() as u16);
        let sequence = PingSequence(self.sequence.fetch_add(1, Ordering::Relaxed));

        let mut pinger = client.pinger(target_ip, identifier).await;
        pinger.timeout(timeout);

        match pinger.ping(sequence, &[0u8; 32]).await {
            Ok((IcmpPacket::V4(_), rtt)) | Ok((IcmpPacket::V6(_), rtt)) => Ok(rtt),
            Err(SurgeError::Timeout { .. }) => Err(ProbeError::Timeout),
            Err(e) => Err(ProbeError::Transport(e.to_string())),
        }
    }
}

impl ProbeGateway for PingExecutor {
    async fn probe(&self, host: &str, timeout: Duration) -> ProbeOutcome {
        // Name resolution counts against the same deadline as the echo itself.
        let result = within(timeout, async {
            let ip = self.resolve_target(host).await?;
            self.execute_ping(ip, timeout).await
        })
        .await;

        let timestamp = Local::now();
        match result {
            Ok(rtt) => ProbeOutcome::success(timestamp, rtt),
            Err(e) => {
                log::debug!("probe of {host} failed: {e}");
                // Re-resolve next time in case the address moved
                self.forget(host);
                ProbeOutcome::failure(timestamp, e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_stalled_lookup_gives_up_at_the_deadline() {
        let started = tokio::time::Instant::now();
        let result = within(
            Duration::from_millis(200),
            std::future::pending::<Result<Duration, ProbeError>>(),
        )
        .await;

        assert_eq!(result, Err(ProbeError::Timeout));
        assert_eq!(started.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_attempt_keeps_its_result() {
        let result = within(Duration::from_secs(5), async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(Duration::from_millis(30))
        })
        .await;

        assert_eq!(result, Ok(Duration::from_millis(30)));
    }

    #[test]
    fn test_sanitize_strips_port_and_junk() {
        assert_eq!(
            sanitize_hostname("example.com:8080"),
            Some("example.com".to_string())
        );
        assert_eq!(
            sanitize_hostname("exa mple;.com"),
            Some("example.com".to_string())
        );
        assert_eq!(sanitize_hostname(":::"), None);
    }

    #[test]
    fn test_ip_literals_are_parsed_directly() {
        assert_eq!(parse_ip_literal("8.8.8.8"), "8.8.8.8".parse().ok());
        assert_eq!(parse_ip_literal("[::1]"), "::1".parse().ok());
        assert_eq!(
            parse_ip_literal("2001:4860:4860::8888"),
            "2001:4860:4860::8888".parse().ok()
        );
        assert_eq!(parse_ip_literal("dns.google"), None);
    }

    #[tokio::test]
    async fn test_unresolvable_input_is_reported_as_unreachable() {
        let executor = PingExecutor::new();
        let outcome = executor.probe("???", Duration::from_secs(1)).await;

        assert!(!outcome.reachable);
        assert_eq!(outcome.latency, None);
        assert!(matches!(outcome.error, Some(ProbeError::Resolve(_))));
    }
}

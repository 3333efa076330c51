use super::ApiError;
use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome totals for one backend route
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteStats {
    pub requests: u64,
    pub failures: u64,
    /// Failures whose body arrived but did not match the expected shape
    pub decode_failures: u64,
    pub total_latency: Duration,
    pub last_error: Option<String>,
}

impl RouteStats {
    pub fn average_latency(&self) -> Duration {
        if self.requests == 0 {
            return Duration::ZERO;
        }
        self.total_latency / self.requests as u32
    }

    pub fn failure_rate(&self) -> f32 {
        if self.requests == 0 {
            0.0
        } else {
            self.failures as f32 / self.requests as f32
        }
    }
}

/// Per-route request accounting, keyed by route label (`projects.status`, ...)
#[derive(Debug, Default)]
pub struct RequestMetrics {
    routes: BTreeMap<String, RouteStats>,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished call, after its body has been decoded
    pub fn record(&mut self, route: &str, latency: Duration, error: Option<&ApiError>) {
        let stats = self.routes.entry(route.to_string()).or_default();
        stats.requests += 1;
        stats.total_latency += latency;

        if let Some(e) = error {
            stats.failures += 1;
            if matches!(e, ApiError::Decode(_)) {
                stats.decode_failures += 1;
            }
            stats.last_error = Some(e.to_string());
        }
    }

    pub fn route(&self, route: &str) -> Option<&RouteStats> {
        self.routes.get(route)
    }

    /// All routes seen so far, ordered by label
    pub fn snapshot(&self) -> Vec<(String, RouteStats)> {
        self.routes
            .iter()
            .map(|(route, stats)| (route.clone(), stats.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_failures_count_as_failures() {
        let mut metrics = RequestMetrics::new();
        metrics.record("user.profile", Duration::from_millis(30), None);
        metrics.record("user.profile", Duration::from_millis(50), None);
        metrics.record(
            "user.profile",
            Duration::from_millis(40),
            Some(&ApiError::Decode("missing field".to_string())),
        );
        metrics.record("transactions", Duration::from_millis(10), Some(&ApiError::Timeout));

        let profile = metrics.route("user.profile").unwrap();
        assert_eq!(profile.requests, 3);
        assert_eq!(profile.failures, 1);
        assert_eq!(profile.decode_failures, 1);
        assert_eq!(profile.average_latency(), Duration::from_millis(40));
        assert!((profile.failure_rate() - 1.0 / 3.0).abs() < 1e-6);
        assert!(profile.last_error.as_deref().unwrap().contains("missing field"));

        let routes: Vec<String> = metrics.snapshot().into_iter().map(|(r, _)| r).collect();
        assert_eq!(routes, vec!["transactions".to_string(), "user.profile".to_string()]);
        assert!(metrics.route("never.called").is_none());
    }
}

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::Instant;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use dashmap::DashMap;

use crate::auth::{resolve_user, CurrentUser};
use crate::config::Rate;
use crate::errors::CoreError;
use crate::server::AppState;

/// Sliding-window request budget per anonymous client. Clients idle for
/// a whole window are dropped by a sweep that runs at most once per window.
pub struct AnonThrottle {
    rate: Rate,
    history: DashMap<String, VecDeque<Instant>>,
    last_sweep: Mutex<Instant>,
}

impl AnonThrottle {
    pub fn new(rate: Rate) -> Self {
        Self {
            rate,
            history: DashMap::new(),
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    /// Records a request from `client`. Over budget, returns the number
    /// of seconds to wait instead.
    pub fn check(&self, client: &str) -> Result<(), u64> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Result<(), u64> {
        let outcome = self.record(client, now);
        self.sweep_idle(now);
        outcome
    }

    fn record(&self, client: &str, now: Instant) -> Result<(), u64> {
        let mut requests = self.history.entry(client.to_string()).or_default();

        // Remove old requests outside the window
        while let Some(&front) = requests.front() {
            if now.duration_since(front) >= self.rate.duration {
                requests.pop_front();
            } else {
                break;
            }
        }

        if requests.len() < self.rate.num_requests {
            requests.push_back(now);
            return Ok(());
        }

        Err(self.wait(&requests, now))
    }

    /// The shard guard from `record` must be released before this runs.
    fn sweep_idle(&self, now: Instant) {
        let Ok(mut last_sweep) = self.last_sweep.try_lock() else {
            return;
        };
        if now.saturating_duration_since(*last_sweep) < self.rate.duration {
            return;
        }
        *last_sweep = now;

        let window = self.rate.duration;
        self.history.retain(|_, requests| {
            requests
                .back()
                .is_some_and(|&last| now.saturating_duration_since(last) < window)
        });
        tracing::debug!("throttle sweep kept {} clients", self.history.len());
    }

    /// Remaining window spread over the requests that will free up.
    fn wait(&self, requests: &VecDeque<Instant>, now: Instant) -> u64 {
        let remaining = requests
            .front()
            .map(|&oldest| self.rate.duration.saturating_sub(now.duration_since(oldest)))
            .unwrap_or(self.rate.duration);
        let available = (self.rate.num_requests + 1).saturating_sub(requests.len()).max(1);
        let wait = remaining.as_secs_f64() / available as f64;
        wait.ceil().max(1.0) as u64
    }

    pub fn tracked_clients(&self) -> usize {
        self.history.len()
    }
}

/// Resolves the caller once per request. Authenticated users are handed
/// to the extractors through the request extensions; anonymous callers
/// are counted against the throttle.
pub async fn authenticate_or_throttle(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = req.into_parts();

    // Bad credentials are reported by the extractors, not here.
    match resolve_user(&parts, &state).await {
        Ok(Some(user)) => {
            parts.extensions.insert(CurrentUser(user));
        }
        Ok(None) | Err(_) => {
            if let Some(throttle) = &state.throttle {
                let client = client_ident(&parts);
                if let Err(wait) = throttle.check(&client) {
                    tracing::warn!("throttled anonymous client {} for {}s", client, wait);
                    return CoreError::throttled(wait).into_response();
                }
            }
        }
    }

    next.run(Request::from_parts(parts, body)).await
}

/// First `X-Forwarded-For` hop, else the peer address.
fn client_ident(parts: &axum::http::request::Parts) -> String {
    if let Some(forwarded) = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
    {
        return forwarded.to_string();
    }

    parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn throttle(num_requests: usize, secs: u64) -> AnonThrottle {
        AnonThrottle::new(Rate {
            num_requests,
            duration: Duration::from_secs(secs),
        })
    }

    #[test]
    fn allows_up_to_the_rate() {
        let throttle = throttle(3, 60);
        let start = Instant::now();
        for i in 0..3 {
            assert!(throttle.check_at("10.0.0.1", start + Duration::from_secs(i)).is_ok());
        }
        assert!(throttle.check_at("10.0.0.1", start + Duration::from_secs(3)).is_err());
        assert!(throttle.check_at("10.0.0.2", start).is_ok());
        assert_eq!(throttle.tracked_clients(), 2);
    }

    #[test]
    fn window_slides() {
        let throttle = throttle(1, 60);
        let start = Instant::now();
        assert!(throttle.check_at("a", start).is_ok());

        let wait = throttle.check_at("a", start + Duration::from_secs(20)).unwrap_err();
        assert_eq!(wait, 40);

        assert!(throttle.check_at("a", start + Duration::from_secs(60)).is_ok());
    }

    #[test]
    fn idle_clients_are_forgotten() {
        let throttle = throttle(1, 60);
        let start = Instant::now();
        for i in 0..10_000 {
            let _ = throttle.check_at(&format!("198.51.100.{}", i), start);
        }
        assert_eq!(throttle.tracked_clients(), 10_000);

        assert!(throttle.check_at("203.0.113.7", start + Duration::from_secs(120)).is_ok());
        assert_eq!(throttle.tracked_clients(), 1);
    }

    #[test]
    fn active_clients_survive_the_sweep() {
        let throttle = throttle(2, 60);
        let start = Instant::now();
        assert!(throttle.check_at("a", start).is_ok());
        assert!(throttle.check_at("b", start + Duration::from_secs(50)).is_ok());

        assert!(throttle.check_at("c", start + Duration::from_secs(70)).is_ok());
        assert_eq!(throttle.tracked_clients(), 2);
        assert!(throttle.check_at("b", start + Duration::from_secs(71)).is_ok());
        assert!(throttle.check_at("b", start + Duration::from_secs(72)).is_err());
    }

    #[test]
    fn identifies_clients_by_forwarded_header() {
        let (parts, _) = axum::http::Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(client_ident(&parts), "203.0.113.9");

        let (parts, _) = axum::http::Request::builder().body(()).unwrap().into_parts();
        assert_eq!(client_ident(&parts), "unknown");
    }
}

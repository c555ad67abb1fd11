use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;
use actix_web::web::Data;
use actix_web::HttpResponse;
use dashmap::DashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window request limiter keyed by client address.
#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max_requests: u32,
    clients: DashMap<IpAddr, Window>,
}

#[derive(Serialize)]
struct TooManyRequests {
    error: &'static str,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self { window, max_requests, clients: DashMap::new() }
    }

    /// Counts a request from `ip`; false once the client is over its budget.
    pub fn check(&self, ip: IpAddr) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: IpAddr, now: Instant) -> bool {
        let mut entry = self.clients.entry(ip).or_insert(Window { started: now, count: 0 });
        if now.duration_since(entry.started) >= self.window {
            *entry = Window { started: now, count: 0 };
        }
        if entry.count >= self.max_requests {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Drops windows that have run out so idle clients don't pile up.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        self.clients.retain(|_, w| now.duration_since(w.started) < self.window);
    }

    pub fn tracked_clients(&self) -> usize {
        self.clients.len()
    }
}

pub async fn purge_periodically(limiter: Arc<RateLimiter>) {
    let mut ticker = actix_web::rt::time::interval(limiter.window);
    loop {
        ticker.tick().await;
        limiter.purge_expired();
    }
}

/// Middleware answering 429 once a peer exceeds the limiter registered as app data.
pub async fn limit_requests<B: MessageBody + 'static>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, actix_web::Error> {
    let over_limit = match (req.app_data::<Data<RateLimiter>>(), req.peer_addr()) {
        (Some(limiter), Some(peer)) => !limiter.check(peer.ip()),
        _ => false,
    };

    if over_limit {
        tracing::warn!(ip = ?req.peer_addr().map(|p| p.ip()), path = req.path(), "rate limit exceeded");
        let resp = HttpResponse::TooManyRequests().json(TooManyRequests {
            error: "Too many requests, please try again later.",
        });
        return Ok(req.into_response(resp).map_into_right_body());
    }

    next.call(req).await.map(ServiceResponse::map_into_left_body)
}

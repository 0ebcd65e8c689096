//! `GET /health` and `GET /ready` (§4.6, §6): handled directly by the
//! adapter, bypassing the pipeline entirely, so an overloaded or paused
//! pipeline never blocks a liveness/readiness probe.

use pel_core::http::{HttpResponse, Method, StatusCode};

use crate::ready::ReadyFlag;

pub const HEALTH_PATH: &str = "/health";
pub const READY_PATH: &str = "/ready";

/// `Some(response)` if `method`/`path` is one of the bypass endpoints;
/// `None` means the caller should hand the request to the pipeline as
/// usual.
pub fn try_handle(method: Method, path: &str, ready: &ReadyFlag) -> Option<HttpResponse> {
    if method != Method::Get {
        return None;
    }
    match path {
        HEALTH_PATH => Some(HttpResponse::new(StatusCode::NO_CONTENT)),
        READY_PATH => Some(HttpResponse::new(if ready.is_ready() {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::BAD_GATEWAY
        })),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_always_returns_204() {
        let ready = ReadyFlag::new();
        let resp = try_handle(Method::Get, HEALTH_PATH, &ready).unwrap();
        assert_eq!(resp.status.as_u16(), 204);
    }

    #[test]
    fn ready_reflects_flag() {
        let ready = ReadyFlag::new();
        assert_eq!(try_handle(Method::Get, READY_PATH, &ready).unwrap().status.as_u16(), 502);
        ready.set_ready(true);
        assert_eq!(try_handle(Method::Get, READY_PATH, &ready).unwrap().status.as_u16(), 204);
    }

    #[test]
    fn other_paths_fall_through() {
        let ready = ReadyFlag::new();
        assert!(try_handle(Method::Get, "/hello", &ready).is_none());
        assert!(try_handle(Method::Post, HEALTH_PATH, &ready).is_none());
    }
}

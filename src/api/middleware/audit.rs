//! Audit logging middleware.
//!
//! Logs every API request with its attribution, method, path and
//! response status. The resolved `AccessSource` is also placed in the
//! request extensions for handlers that record who acted.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::api::types::{ApiContext, STAFF_ID_HEADER};
use crate::core_state::AccessSource;

/// Resolve attribution from `X-Staff-Id`. A malformed value is treated
/// as anonymous rather than rejected.
pub fn access_source<B>(req: &Request<B>) -> AccessSource {
    req.headers()
        .get(STAFF_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| uuid::Uuid::parse_str(v.trim()).ok())
        .map(AccessSource::Staff)
        .unwrap_or(AccessSource::Anonymous)
}

/// Log API access for audit trail.
/// Accesses `ApiContext` from request extensions.
pub async fn log_access(mut req: Request<axum::body::Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();

    let ctx = req.extensions().get::<ApiContext>().cloned();
    let source = access_source(&req);
    req.extensions_mut().insert(source.clone());

    let response = next.run(req).await;

    let status = response.status().as_u16();
    tracing::debug!(%method, %path, status, source = %source, "API request");
    if let Some(ctx) = ctx {
        ctx.core
            .log_access(source, &format!("{method} {path}"), &format!("status:{status}"));
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn staff_header_is_attributed() {
        let id = Uuid::new_v4();
        let req = Request::builder()
            .header("X-Staff-Id", id.to_string())
            .body(())
            .unwrap();
        assert_eq!(access_source(&req), AccessSource::Staff(id));
    }

    #[test]
    fn missing_or_bad_header_is_anonymous() {
        let req = Request::builder().body(()).unwrap();
        assert_eq!(access_source(&req), AccessSource::Anonymous);

        let req = Request::builder()
            .header("X-Staff-Id", "admin")
            .body(())
            .unwrap();
        assert_eq!(access_source(&req), AccessSource::Anonymous);
    }
}

//! Router assembly and the ambient middleware stack every route gets:
//! request-id propagation and request tracing, ahead of the versioned API
//! routes themselves.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::routes;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Echoes a caller-supplied `x-request-id`, or mints one, onto both the
/// inbound request (for downstream tracing spans) and the response.
async fn ensure_request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);
    let request_id = req
        .headers()
        .get(&header_name)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_str(&Uuid::new_v4().to_string()).expect("uuid is a valid header value"));
    req.headers_mut().insert(header_name.clone(), request_id.clone());

    let mut response = next.run(req).await;
    response.headers_mut().insert(header_name, request_id);
    response
}

fn layer_defaults(router: Router<AppState>) -> Router<AppState> {
    router
        .layer(middleware::from_fn(ensure_request_id))
        .layer(TraceLayer::new_for_http())
}

/// Builds the full `/api/v1` router over `state`.
pub fn build_router(state: AppState) -> Router {
    let api = routes::documents::router();
    layer_defaults(Router::new().nest("/api/v1", api)).with_state(state)
}

pub async fn listen<A: ToSocketAddrs>(router: Router, addr: A) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

use axum::{
    body::Bytes,
    extract::Path,
    http::{Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Extension, Router,
};
use hyper::Server;
use serde_json::json;
use std::net::SocketAddr;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use uuid::Uuid;

use crate::catalog::CatalogSync;
use crate::state::AppState;
use crate::webhook::dispatch;

/// Health check endpoint
async fn health(Extension(state): Extension<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "pms-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.registry.names(),
    }))
}

/// Inbound PMS webhook. Plain-text body, status from the dispatch outcome.
async fn webhook(
    Extension(state): Extension<AppState>,
    Path(provider_name): Path<String>,
    body: Bytes,
) -> Response {
    let response = dispatch(&state, &provider_name, &body).await;
    let status = StatusCode::from_u16(response.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, response.body).into_response()
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Refreshes the hotel's catalog from its PMS and returns the unified products
async fn upsell_products(
    Extension(state): Extension<AppState>,
    Path(hotel_id): Path<String>,
) -> Response {
    let hotel_id = match Uuid::parse_str(&hotel_id) {
        Ok(id) => id,
        Err(_) => return error_response(StatusCode::NOT_FOUND, "Hotel not found"),
    };
    let hotel = match state.store.find_hotel(hotel_id).await {
        Ok(Some(hotel)) => hotel,
        Ok(None) => return error_response(StatusCode::NOT_FOUND, "Hotel not found"),
        Err(e) => {
            error!("Error loading hotel {}: {}", hotel_id, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error loading hotel");
        }
    };

    match CatalogSync::new(&state.registry, state.store.as_ref())
        .refresh(&hotel)
        .await
    {
        Ok(report) => Json(json!({ "upsell_products": report.products })).into_response(),
        Err(e) => {
            error!("Error retrieving upsell products for hotel {}: {}", hotel_id, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error retrieving upsell products",
            )
        }
    }
}

async fn hotels(Extension(state): Extension<AppState>) -> Response {
    match state.store.list_hotels().await {
        Ok(hotels) => {
            let hotels: Vec<_> = hotels
                .iter()
                .map(|h| {
                    json!({
                        "id": h.id,
                        "name": h.name,
                        "city": h.city,
                        "pms": h.pms_provider_name,
                    })
                })
                .collect();
            Json(json!({ "hotels": hotels })).into_response()
        }
        Err(e) => {
            error!("Error listing hotels: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Error listing hotels")
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_server(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/webhook/:provider_name/", post(webhook))
        .route("/hotels/", get(hotels))
        .route("/hotels/:hotel_id/upsell-products/", get(upsell_products))
        .layer(Extension(state))
        .layer(ServiceBuilder::new().layer(cors))
}

/// Start the HTTP server on the specified port
pub async fn start_server(state: AppState, port: u16) -> anyhow::Result<()> {
    let app = create_server(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    info!("HTTP server running on http://localhost:{}", port);
    info!("Health check: http://localhost:{}/health", port);
    info!("Webhooks:     http://localhost:{}/webhook/<provider>/", port);

    Server::bind(&addr).serve(app.into_make_service()).await?;
    Ok(())
}

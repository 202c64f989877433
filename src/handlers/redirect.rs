use crate::{models::find_by_code, AppState};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// GET /:code
///
/// Load the mapping, take the first record carrying `code`, and answer with a
/// 302 to its destination. Unknown codes get a plain-text 404.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    let links = state.store.load().await;

    match find_by_code(&links, &code) {
        Some((name, record)) => {
            tracing::debug!("Redirecting '{}' ({}) to {}", code, name, record.destination_url);
            (
                StatusCode::FOUND,
                [(header::LOCATION, record.destination_url.clone())],
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "Short URL not found").into_response(),
    }
}

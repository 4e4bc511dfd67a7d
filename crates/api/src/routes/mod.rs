pub mod health;
pub mod sequence_templates;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /sequence-templates                 see sequence_templates::router
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/sequence-templates", sequence_templates::router())
}

//! Routes for sequence templates, mounted at `/sequence-templates`.
//!
//! ```text
//! GET    /                  list_templates
//! POST   /                  create_template
//! POST   /validate          validate_template
//! GET    /{id}              get_template
//! PUT    /{id}              update_template
//! DELETE /{id}              deactivate_template
//! POST   /{id}/schedule     schedule_template
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::sequence_templates as handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_templates).post(handlers::create_template),
        )
        .route("/validate", post(handlers::validate_template))
        .route(
            "/{id}",
            get(handlers::get_template)
                .put(handlers::update_template)
                .delete(handlers::deactivate_template),
        )
        .route("/{id}/schedule", post(handlers::schedule_template))
}

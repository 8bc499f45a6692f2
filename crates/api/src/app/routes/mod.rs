use axum::{Router, routing::get};

pub mod documents;
pub mod grants;
pub mod imports;
pub mod principals;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/principals", principals::router())
        .nest("/grants", grants::router())
        .nest("/documents", documents::router())
        .nest("/imports", imports::router())
}

//! Static single-page application handler.
//!
//! Files are served from the build directory. Any path without a matching
//! file gets the index document with a 200, so client-side routes survive a
//! reload.

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::config::FrontendConfig;

pub fn router(config: &FrontendConfig) -> Router {
    let index = config.directory.join(&config.index_file);
    let files = ServeDir::new(&config.directory)
        .append_index_html_on_directories(true)
        .fallback(ServeFile::new(index));

    Router::new().fallback_service(files)
}

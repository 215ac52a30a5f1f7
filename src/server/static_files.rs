use std::path::Path;

use tower_http::services::{ServeDir, ServeFile};

use crate::utils::constants::INDEX_DOCUMENT;

/// Files under `dir`; unknown paths get `index.html` with 200 so the
/// single-page app can route on the client. A relative `dir` is resolved
/// against the process working directory.
pub fn service(dir: &Path) -> ServeDir<ServeFile> {
    ServeDir::new(dir).fallback(ServeFile::new(dir.join(INDEX_DOCUMENT)))
}

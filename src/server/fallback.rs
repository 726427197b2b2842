// src/server/fallback.rs

//! Request classification for the dev server.
//!
//! Single-page apps route on the client, so a browser navigating to
//! `/about/team` must receive `index.html`. A request qualifies for that
//! history fallback only when it is a `GET`/`HEAD`, accepts HTML, and its
//! last path segment has no `.` (which would indicate a file).

use std::path::{Component, Path, PathBuf};

use axum::http::Method;
use percent_encoding::percent_decode_str;

/// Script tag injected into every served HTML document.
pub const CLIENT_SCRIPT_TAG: &str = r#"<script src="/__assetdag/client.js"></script>"#;

/// Whether the `Accept` header admits an HTML response.
///
/// A missing header does not qualify.
pub fn accepts_html(accept: Option<&str>) -> bool {
    accept.is_some_and(|value| {
        value
            .split(',')
            .map(|part| part.split(';').next().unwrap_or("").trim())
            .any(|mime| mime.eq_ignore_ascii_case("text/html") || mime == "*/*")
    })
}

pub fn wants_history_fallback(method: &Method, accept: Option<&str>, uri_path: &str) -> bool {
    if method != Method::GET && method != Method::HEAD {
        return false;
    }
    if !accepts_html(accept) {
        return false;
    }
    let last = uri_path.rsplit('/').next().unwrap_or("");
    !last.contains('.')
}

/// Map a request path onto the served directory.
///
/// The path is percent-decoded first. Directory-style paths (`/`, `/docs/`)
/// map to their `index.html`. Returns `None` for paths that are not UTF-8
/// once decoded or that try to escape `root`.
pub fn resolve_request_path(root: &Path, uri_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(uri_path).decode_utf8().ok()?;
    let trimmed = decoded.trim_start_matches('/');
    let mut resolved = root.to_path_buf();

    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    if trimmed.is_empty() || decoded.ends_with('/') {
        resolved.push("index.html");
    }
    Some(resolved)
}

pub fn is_html_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"))
}

/// Insert the live-reload client before the last `</body>`, or append it
/// when the document has none.
pub fn inject_client_script(html: &str) -> String {
    let lower = html.to_ascii_lowercase();
    match lower.rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(html.len() + CLIENT_SCRIPT_TAG.len());
            out.push_str(&html[..idx]);
            out.push_str(CLIENT_SCRIPT_TAG);
            out.push_str(&html[idx..]);
            out
        }
        None => format!("{html}{CLIENT_SCRIPT_TAG}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_fallback_only_for_html_navigation() {
        let html = Some("text/html,application/xhtml+xml;q=0.9");
        assert!(wants_history_fallback(&Method::GET, html, "/about/team"));
        assert!(wants_history_fallback(&Method::HEAD, Some("*/*"), "/about"));

        assert!(!wants_history_fallback(&Method::POST, html, "/about"));
        assert!(!wants_history_fallback(&Method::GET, Some("application/json"), "/api/items"));
        assert!(!wants_history_fallback(&Method::GET, None, "/about"));
        assert!(!wants_history_fallback(&Method::GET, html, "/missing.png"));
    }

    #[test]
    fn resolve_maps_directories_to_index() {
        let root = Path::new("site");
        assert_eq!(
            resolve_request_path(root, "/"),
            Some(PathBuf::from("site/index.html"))
        );
        assert_eq!(
            resolve_request_path(root, "/docs/"),
            Some(PathBuf::from("site/docs/index.html"))
        );
        assert_eq!(
            resolve_request_path(root, "/css/main.css"),
            Some(PathBuf::from("site/css/main.css"))
        );
        assert_eq!(resolve_request_path(root, "/../secret"), None);
    }

    #[test]
    fn resolve_decodes_escaped_segments() {
        let root = Path::new("site");
        assert_eq!(
            resolve_request_path(root, "/my%20page.html"),
            Some(PathBuf::from("site/my page.html"))
        );
        assert_eq!(
            resolve_request_path(root, "/caf%C3%A9/"),
            Some(PathBuf::from("site/café/index.html"))
        );
        assert_eq!(resolve_request_path(root, "/%2e%2e/secret"), None);
        assert_eq!(resolve_request_path(root, "/docs/%2E%2E%2F%2E%2E%2Fsecret"), None);
        assert_eq!(resolve_request_path(root, "/%FF.html"), None);
    }

    #[test]
    fn client_script_goes_before_closing_body() {
        let out = inject_client_script("<html><BODY><p>x</p></BODY></html>");
        assert_eq!(
            out,
            format!("<html><BODY><p>x</p>{CLIENT_SCRIPT_TAG}</BODY></html>")
        );

        let out = inject_client_script("<p>fragment</p>");
        assert!(out.ends_with(CLIENT_SCRIPT_TAG));
    }
}

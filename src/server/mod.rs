// src/server/mod.rs

//! Development HTTP server with live reload.
//!
//! Serves the build directory, injects a small client script into HTML
//! documents and pushes [`ReloadSignal`]s to browsers over Server-Sent
//! Events.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

pub mod fallback;
pub mod reload;

pub use reload::{ReloadHub, ReloadSignal};

use fallback::{inject_client_script, is_html_path, resolve_request_path, wants_history_fallback};

pub const RELOAD_PATH: &str = "/__assetdag/reload";
pub const CLIENT_PATH: &str = "/__assetdag/client.js";

const CLIENT_JS: &str = r#"(function () {
  var source = new EventSource("/__assetdag/reload");
  source.addEventListener("reload", function () {
    window.location.reload();
  });
  source.addEventListener("css", function () {
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    var stamp = Date.now();
    links.forEach(function (link) {
      var url = new URL(link.href, window.location.href);
      url.searchParams.set("assetdag", stamp);
      link.href = url.toString();
    });
  });
})();
"#;

#[derive(Debug, Clone)]
struct ServerState {
    root: PathBuf,
    hub: ReloadHub,
}

/// Build the router serving `root`.
pub fn router(root: impl Into<PathBuf>, hub: ReloadHub) -> Router {
    let state = ServerState {
        root: root.into(),
        hub,
    };

    Router::new()
        .route(RELOAD_PATH, get(reload_events))
        .route(CLIENT_PATH, get(client_script))
        .fallback(serve_build_dir)
        .with_state(state)
}

/// A running dev server.
#[derive(Debug)]
pub struct DevServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl DevServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for DevServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Bind `host:port` and serve in the background.
///
/// Binding happens before returning, so an occupied port is reported to
/// the caller.
pub async fn start(host: &str, port: u16, root: PathBuf, hub: ReloadHub) -> Result<DevServer> {
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("binding dev server to {host}:{port}"))?;
    let addr = listener.local_addr().context("reading dev server address")?;

    info!(%addr, root = %root.display(), "dev server listening");

    let app = router(root, hub);
    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "dev server stopped");
        }
    });

    Ok(DevServer { addr, task })
}

async fn reload_events(
    State(state): State<ServerState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("browser connected to reload stream");
    let stream = BroadcastStream::new(state.hub.subscribe()).filter_map(|signal| {
        // Lagged receivers skip missed signals; the next one still applies.
        signal.ok().map(|s| {
            Ok(Event::default()
                .event(s.event_name())
                .data(s.event_name()))
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_JS,
    )
}

async fn serve_build_dir(State(state): State<ServerState>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let accept = req
        .headers()
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let Some(target) = resolve_request_path(&state.root, &path) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if is_html_path(&target) && target.is_file() {
        return html_response(&target).await;
    }

    if !target.exists() && wants_history_fallback(req.method(), accept.as_deref(), &path) {
        debug!(path = %path, "history fallback to index.html");
        return html_response(&state.root.join("index.html")).await;
    }

    match ServeDir::new(&state.root).oneshot(req).await {
        Ok(res) => res.into_response(),
        Err(never) => match never {},
    }
}

async fn html_response(path: &std::path::Path) -> Response {
    match tokio::fs::read_to_string(path).await {
        Ok(body) => Html(inject_client_script(&body)).into_response(),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "html not readable");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

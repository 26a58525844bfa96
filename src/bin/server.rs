#![forbid(unsafe_code)]

//! Axum front end serving the custom player pages.
//!
//! Every request resolves to a terminal outcome in one pass: usage page,
//! favicon 404, a rendered player page, a 400 explanation, or a 500. The only
//! suspension point is the metadata lookup, which runs on the blocking pool;
//! nothing is shared across requests beyond the immutable resolver.

use std::{net::IpAddr, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result, anyhow};
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use tubeframe::config::{ApiCredential, RuntimeOverrides, resolve_runtime_config};
use tubeframe::metadata::Resolver;
use tubeframe::render::{
    RenderMode, render_bad_request_page, render_internal_error_page, render_player_page,
    render_usage_page,
};
use tubeframe::security::ensure_unprivileged;
use tubeframe::validate::validate;

/// Successful player pages are cacheable for this long.
const CACHE_TTL_SECONDS: u32 = 3600;

// Loose path gate. Deliberately wider than the strict validator so the two
// layers stay independent: a segment can pass here and still be rejected.
const PATH_TOKEN_MIN: usize = 10;
const PATH_TOKEN_MAX: usize = 11;

#[derive(Clone)]
struct AppState {
    resolver: Arc<Resolver>,
}

/// Terminal error outcome carrying a user-visible HTML page.
#[derive(Debug)]
struct PageError {
    status: StatusCode,
    body: String,
}

impl PageError {
    /// The path named no recognized route or failed identifier validation.
    fn bad_request() -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: render_bad_request_page(),
        }
    }

    /// The single fatal-error escape hatch; the page stays generic, the
    /// details go to the log.
    fn internal() -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: render_internal_error_page(),
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        (
            self.status,
            [(
                header::CONTENT_TYPE,
                HeaderValue::from_static("text/html; charset=utf-8"),
            )],
            self.body,
        )
            .into_response()
    }
}

fn parse_server_args<I>(iter: I) -> Result<RuntimeOverrides>
where
    I: IntoIterator<Item = String>,
{
    let mut overrides = RuntimeOverrides::default();
    let mut args = iter.into_iter();
    while let Some(arg) = args.next() {
        if let Some(value) = arg.strip_prefix("--port=") {
            overrides.port = Some(parse_port_arg(value)?);
            continue;
        }
        if let Some(value) = arg.strip_prefix("--host=") {
            overrides.host = Some(value.to_string());
            continue;
        }
        if let Some(value) = arg.strip_prefix("--api-key=") {
            overrides.api_key = Some(value.to_string());
            continue;
        }

        match arg.as_str() {
            "--port" => {
                let value = args.next().ok_or_else(|| anyhow!("--port requires a value"))?;
                overrides.port = Some(parse_port_arg(&value)?);
            }
            "--host" => {
                let value = args.next().ok_or_else(|| anyhow!("--host requires a value"))?;
                overrides.host = Some(value);
            }
            "--api-key" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--api-key requires a value"))?;
                overrides.api_key = Some(value);
            }
            _ => return Err(anyhow!("unknown argument: {arg}")),
        }
    }
    Ok(overrides)
}

fn parse_port_arg(value: &str) -> Result<u16> {
    value
        .parse::<u16>()
        .context("expected a numeric port between 0 and 65535")
}

fn parse_host_arg(value: &str) -> Result<IpAddr> {
    value
        .parse::<IpAddr>()
        .context("expected a valid IPv4 or IPv6 address for --host/TUBEFRAME_HOST")
}

#[tokio::main]
async fn main() -> Result<()> {
    let overrides = parse_server_args(std::env::args().skip(1))?;

    ensure_unprivileged("server")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = resolve_runtime_config(overrides)?;
    match &config.credential {
        ApiCredential::Key(_) => info!("metadata lookups enabled"),
        ApiCredential::Placeholder => {
            info!("placeholder API key configured; serving fallback metadata")
        }
        ApiCredential::Absent => info!("no API key configured; serving fallback metadata"),
    }

    let state = AppState {
        resolver: Arc::new(Resolver::new(config.credential.clone())),
    };

    let app = Router::new()
        .route("/", get(usage))
        .route("/favicon.ico", get(favicon))
        .fallback(dispatch)
        .with_state(state);

    let host = parse_host_arg(&config.host)?;
    let addr = SocketAddr::new(host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {}", addr))?;
    info!("player server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running player server")?;

    Ok(())
}

async fn shutdown_signal() {
    // Only graceful shutdown is affected when this fails; Ctrl+C still
    // terminates the process.
    if let Err(err) = signal::ctrl_c().await {
        error!("failed to install Ctrl+C handler: {}", err);
    }
}

async fn usage() -> Html<String> {
    Html(render_usage_page())
}

async fn favicon() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn dispatch(State(state): State<AppState>, uri: Uri) -> Response {
    match respond(&state, uri.path()).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Splits a path into `(token, audio_requested)` when it has the shape
/// `/{token}` or `/{token}/audio` with a 10-11 byte token. Only the length is
/// checked here; the charset check belongs to the validator.
fn match_player_path(path: &str) -> Option<(&str, bool)> {
    let rest = path.strip_prefix('/')?;
    let (token, audio) = match rest.split_once('/') {
        None => (rest, false),
        Some((token, "audio")) => (token, true),
        Some(_) => return None,
    };
    if (PATH_TOKEN_MIN..=PATH_TOKEN_MAX).contains(&token.len()) {
        Some((token, audio))
    } else {
        None
    }
}

async fn respond(state: &AppState, path: &str) -> Result<Response, PageError> {
    let Some((token, audio)) = match_player_path(path) else {
        return Err(PageError::bad_request());
    };
    let Some(id) = validate(token) else {
        return Err(PageError::bad_request());
    };
    let mode = RenderMode::from_audio_flag(audio);

    // The lookup blocks on the network, so it runs on the blocking pool; a
    // panicking or cancelled task is the one internal failure this route can
    // hit, and it turns into a 500 here rather than propagating.
    let resolver = state.resolver.clone();
    let lookup_id = id.clone();
    let metadata = tokio::task::spawn_blocking(move || resolver.resolve(&lookup_id))
        .await
        .map_err(|err| {
            error!(error = %err, "metadata task failed");
            PageError::internal()
        })?;

    let html = render_player_page(&id, mode, &metadata);
    Ok(player_page_response(html))
}

fn player_page_response(html: String) -> Response {
    let mut response = (StatusCode::OK, html).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_str(&format!("public, max-age={CACHE_TTL_SECONDS}"))
            .unwrap_or(HeaderValue::from_static("public, max-age=3600")),
    );
    headers.insert(
        header::X_FRAME_OPTIONS,
        HeaderValue::from_static("SAMEORIGIN"),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    fn offline_state() -> AppState {
        AppState {
            resolver: Arc::new(Resolver::new(ApiCredential::Absent)),
        }
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn match_player_path_accepts_both_shapes() {
        assert_eq!(
            match_player_path("/dQw4w9WgXcQ"),
            Some(("dQw4w9WgXcQ", false))
        );
        assert_eq!(
            match_player_path("/dQw4w9WgXcQ/audio"),
            Some(("dQw4w9WgXcQ", true))
        );
    }

    #[test]
    fn match_player_path_rejects_everything_else() {
        assert_eq!(match_player_path("/"), None);
        assert_eq!(match_player_path("/bad!"), None);
        assert_eq!(match_player_path("/dQw4w9WgXcQ/video"), None);
        assert_eq!(match_player_path("/dQw4w9WgXcQ/audio/extra"), None);
        assert_eq!(match_player_path("/waytoolongtoken"), None);
    }

    #[test]
    fn match_player_path_is_looser_than_the_validator() {
        // Right length, wrong charset: passes the path gate, must then be
        // caught by strict validation.
        let (token, _) = match_player_path("/dQw4w9WgXc!").unwrap();
        assert!(validate(token).is_none());
    }

    #[tokio::test]
    async fn video_path_renders_a_player_page() {
        let response = respond(&offline_state(), "/dQw4w9WgXcQ").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL).unwrap(),
            "public, max-age=3600"
        );
        assert_eq!(
            response.headers().get(header::X_FRAME_OPTIONS).unwrap(),
            "SAMEORIGIN"
        );
        assert_eq!(
            response
                .headers()
                .get(header::X_CONTENT_TYPE_OPTIONS)
                .unwrap(),
            "nosniff"
        );
        assert_eq!(
            response.headers().get(header::REFERRER_POLICY).unwrap(),
            "strict-origin-when-cross-origin"
        );

        let body = body_string(response).await;
        assert!(body.contains("embed/dQw4w9WgXcQ?"));
        assert!(body.contains("var AUDIO_MODE = false;"));
        // Offline resolver serves the fallback metadata.
        assert!(body.contains("Video - Unknown Channel"));
    }

    #[tokio::test]
    async fn audio_suffix_selects_audio_mode() {
        let response = respond(&offline_state(), "/dQw4w9WgXcQ/audio")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_string(response).await;
        assert!(body.contains("var AUDIO_MODE = true;"));
        assert!(body.contains("iv_load_policy=3"));
    }

    #[tokio::test]
    async fn malformed_paths_get_the_400_page() {
        for path in ["/bad!", "/dQw4w9WgXcQ/extra", "/dQw4w9WgXcQQQ"] {
            let err = respond(&offline_state(), path).await.unwrap_err();
            assert_eq!(err.status, StatusCode::BAD_REQUEST, "path {path}");
        }
    }

    #[tokio::test]
    async fn loose_match_strict_reject_is_a_400() {
        let err = respond(&offline_state(), "/dQw4w9WgXc!").await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn usage_page_is_served_at_root() {
        let Html(body) = usage().await;
        assert!(body.contains("/{video_id}"));
    }

    #[tokio::test]
    async fn favicon_is_a_404() {
        assert_eq!(favicon().await, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn page_error_renders_html() {
        let response = PageError::bad_request().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        let body = body_string(response).await;
        assert!(body.contains("Invalid URL"));
    }

    #[test]
    fn server_args_parse_both_flag_forms() {
        let overrides = parse_server_args(
            ["--port", "9000", "--host=0.0.0.0", "--api-key=k"]
                .into_iter()
                .map(String::from),
        )
        .unwrap();
        assert_eq!(overrides.port, Some(9000));
        assert_eq!(overrides.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(overrides.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn server_args_reject_unknown_flags() {
        let err = parse_server_args(["--bogus".to_string()]).unwrap_err();
        assert!(err.to_string().contains("unknown argument"));
    }

    #[test]
    fn server_args_require_values() {
        assert!(parse_server_args(["--port".to_string()]).is_err());
        assert!(parse_server_args(["--port".to_string(), "nope".to_string()]).is_err());
    }
}

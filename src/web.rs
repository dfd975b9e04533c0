use crate::gloss::{WordBreakdown, placeholder_breakdown};
use crate::text::{decode_json_strings, parse_verse_words};
use crate::upstream::{Upstream, UpstreamConfig, UpstreamError, take_data};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn};

type SharedState = Arc<AppState>;

const SURAHS_FAILED: &str = "Failed to fetch surahs";
const SURAH_FAILED: &str = "Failed to fetch surah data";
const VERSE_FAILED: &str = "Failed to fetch verse data";

/// Immutable per-process state; handlers never mutate it.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Upstream,
}

#[derive(Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub upstream: UpstreamConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            upstream: UpstreamConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum WebError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub async fn serve(config: ServerConfig) -> Result<(), WebError> {
    let state = Arc::new(AppState {
        upstream: Upstream::new(config.upstream.clone()),
    });
    let router = build_router(state);
    info!(
        %config.addr,
        upstream = %config.upstream.base_url,
        script = %config.upstream.script_edition,
        translation = %config.upstream.translation_edition,
        "Binding HTTP listener"
    );
    let listener = TcpListener::bind(config.addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("HTTP server exited");
    Ok(())
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    /// Logs the upstream cause and hides it behind a generic message.
    fn upstream(err: UpstreamError, message: &'static str) -> Self {
        error!(error = %err, "{message}");
        Self::internal(message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let payload = json!({ "error": self.message });
        (self.status, Json(payload)).into_response()
    }
}

pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/surahs", get(api_surahs))
        .route("/api/surah/:number", get(api_surah))
        .route("/api/verse/:surah/:verse", get(api_verse))
        .route("/healthz", get(health))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": "quran-wbw-proxy" }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChapterPayload {
    surah: Value,
    translation: Value,
    #[serde(rename = "wordByWord")]
    word_by_word: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersePayload {
    verse: Value,
    translation: Value,
    #[serde(rename = "wordByWord")]
    word_by_word: Vec<WordBreakdown>,
}

async fn api_surahs(State(state): State<SharedState>) -> Result<Json<Value>, ApiError> {
    state
        .upstream
        .chapter_list()
        .await
        .map(Json)
        .map_err(|err| ApiError::upstream(err, SURAHS_FAILED))
}

async fn api_surah(
    State(state): State<SharedState>,
    Path(number): Path<String>,
) -> Result<Json<ChapterPayload>, ApiError> {
    let upstream = &state.upstream;
    let (script, translation, general) = tokio::try_join!(
        upstream.chapter_script(&number),
        upstream.chapter_translation(&number),
        upstream.chapter_default(&number),
    )
    .map_err(|err| ApiError::upstream(err, SURAH_FAILED))?;

    let mut surah =
        take_data(script, "surah script").map_err(|err| ApiError::upstream(err, SURAH_FAILED))?;
    let translation = take_data(translation, "surah translation")
        .map_err(|err| ApiError::upstream(err, SURAH_FAILED))?;
    let word_by_word =
        take_data(general, "surah").map_err(|err| ApiError::upstream(err, SURAH_FAILED))?;

    let fallbacks = decode_json_strings(&mut surah);
    if fallbacks > 0 {
        warn!(surah = %number, fallbacks, "Some script strings kept their escaped form");
    }

    Ok(Json(ChapterPayload {
        surah,
        translation,
        word_by_word,
    }))
}

async fn api_verse(
    State(state): State<SharedState>,
    Path((surah, verse)): Path<(String, String)>,
) -> Result<Json<VersePayload>, ApiError> {
    let upstream = &state.upstream;
    let (script, translation) = tokio::try_join!(
        upstream.verse_script(&surah, &verse),
        upstream.verse_translation(&surah, &verse),
    )
    .map_err(|err| ApiError::upstream(err, VERSE_FAILED))?;

    let mut verse_data =
        take_data(script, "verse script").map_err(|err| ApiError::upstream(err, VERSE_FAILED))?;
    let translation = take_data(translation, "verse translation")
        .map_err(|err| ApiError::upstream(err, VERSE_FAILED))?;
    decode_json_strings(&mut verse_data);

    let text = verse_data
        .get("text")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            ApiError::upstream(
                UpstreamError::Body {
                    url: format!("ayah/{surah}:{verse}"),
                    reason: "verse has no `text` member".to_string(),
                },
                VERSE_FAILED,
            )
        })?;
    let word_by_word = placeholder_breakdown(&parse_verse_words(text));

    Ok(Json(VersePayload {
        verse: verse_data,
        translation,
        word_by_word,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gloss::AnnotationSource;
    use axum::{body, body::Body, http::Request};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn escaped(text: &str) -> String {
        text.encode_utf16()
            .map(|unit| format!("\\u{unit:04x}"))
            .collect()
    }

    fn test_router(base_url: String) -> Router {
        let state = Arc::new(AppState {
            upstream: Upstream::new(UpstreamConfig {
                base_url,
                ..UpstreamConfig::default()
            }),
        });
        build_router(state)
    }

    async fn mount_json(server: &MockServer, route: &str, body: Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn envelope(data: Value) -> Value {
        json!({ "code": 200, "status": "OK", "data": data })
    }

    #[tokio::test]
    async fn surahs_pass_through_verbatim() {
        let server = MockServer::start().await;
        let list = envelope(json!([{ "number": 1, "englishName": "Al-Faatiha" }]));
        mount_json(&server, "/surah", list.clone()).await;

        let (status, body) = get(test_router(server.uri()), "/api/surahs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, list);
    }

    #[tokio::test]
    async fn surah_merges_and_decodes_script() {
        let server = MockServer::start().await;
        let script = envelope(json!({
            "number": 1,
            "englishName": "Al-Faatiha",
            "ayahs": [{ "numberInSurah": 1, "text": escaped("بِسْمِ اللَّهِ") }]
        }));
        let translation = envelope(json!({
            "number": 1,
            "ayahs": [{ "numberInSurah": 1, "text": escaped("kept") }]
        }));
        mount_json(&server, "/surah/1/ar.alafasy", script).await;
        mount_json(&server, "/surah/1/en.sahih", translation).await;
        mount_json(&server, "/surah/1", envelope(json!({ "number": 1 }))).await;

        let (status, body) = get(test_router(server.uri()), "/api/surah/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["surah"]["ayahs"][0]["text"], "بِسْمِ اللَّهِ");
        assert_eq!(body["translation"]["ayahs"][0]["text"], escaped("kept"));
        assert_eq!(body["wordByWord"]["number"], 1);
    }

    #[tokio::test]
    async fn surah_fails_whole_when_translation_fails() {
        let server = MockServer::start().await;
        mount_json(&server, "/surah/2/ar.alafasy", envelope(json!({ "number": 2 }))).await;
        mount_json(&server, "/surah/2", envelope(json!({ "number": 2 }))).await;
        Mock::given(method("GET"))
            .and(path("/surah/2/en.sahih"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let (status, body) = get(test_router(server.uri()), "/api/surah/2").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({ "error": "Failed to fetch surah data" }));
    }

    #[tokio::test]
    async fn verse_synthesizes_placeholder_words() {
        let server = MockServer::start().await;
        let text = "الْحَمْدُ لِلَّهِ  رَبِّ الْعَالَمِينَ";
        mount_json(
            &server,
            "/ayah/1:2/ar.alafasy",
            envelope(json!({ "number": 2, "text": escaped(text) })),
        )
        .await;
        mount_json(
            &server,
            "/ayah/1:2/en.sahih",
            envelope(json!({ "number": 2, "text": "[All] praise is [due] to Allah" })),
        )
        .await;

        let (status, body) = get(test_router(server.uri()), "/api/verse/1/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["verse"]["text"], text);
        let words: Vec<WordBreakdown> =
            serde_json::from_value(body["wordByWord"].clone()).unwrap();
        assert_eq!(words.len(), 4);
        assert_eq!(words[3].arabic, "الْعَالَمِينَ");
        assert_eq!(words[3].transliteration, "word4");
        assert_eq!(words[0].translation, "meaning1");
        assert_eq!(words[2].grammar, "grammar3");
        assert!(words.iter().all(|w| w.source == AnnotationSource::Placeholder));
        assert_eq!(body["translation"]["text"], "[All] praise is [due] to Allah");
    }

    #[tokio::test]
    async fn verse_without_text_is_an_error() {
        let server = MockServer::start().await;
        mount_json(&server, "/ayah/1:9/ar.alafasy", envelope(json!({ "number": 9 }))).await;
        mount_json(&server, "/ayah/1:9/en.sahih", envelope(json!({ "number": 9 }))).await;

        let (status, body) = get(test_router(server.uri()), "/api/verse/1/9").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch verse data");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_500() {
        let server = MockServer::start().await;
        let uri = server.uri();
        drop(server);

        let (status, body) = get(test_router(uri), "/api/surahs").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch surahs");
    }

    #[tokio::test]
    async fn encoded_segments_stay_under_surah_path() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let router = test_router(format!("{}/v1", server.uri()));

        let (status, body) = get(router, "/api/surah/..%2F..%2Fadmin%3Fx%3D").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch surah data");
        let requests = server.received_requests().await.unwrap();
        assert!(!requests.is_empty());
        for request in &requests {
            assert!(request.url.path().starts_with("/v1/surah/"), "{}", request.url);
            assert!(request.url.query().is_none(), "{}", request.url);
        }
    }

    #[tokio::test]
    async fn dot_segments_never_reach_upstream() {
        let server = MockServer::start().await;
        let router = test_router(server.uri());

        let (status, body) = get(router.clone(), "/api/verse/%2E%2E/1").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch verse data");
        let (status, _) = get(router, "/api/surah/%2E%2E").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, body) = get(test_router("http://127.0.0.1:1".into()), "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}

//! Exercises [`GeminiApi`] against an in-process mock of the REST endpoint.

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::{Json, Router};
use serde_json::{json, Value};

use carmod_core::assets::AssetGenerationRequest;
use carmod_core::geometry::PixelSize;
use carmod_core::payload::ImagePayload;
use carmod_core::placement::GenerationRequest;
use carmod_gemini::{GeminiApi, GeminiConfig, GeminiError, ImageGenerator};

// ---------------------------------------------------------------------------
// Mock server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Seen {
    path: String,
    api_key: Option<String>,
    body: Value,
}

struct Mock {
    status: StatusCode,
    reply: Value,
    seen: Mutex<Vec<Seen>>,
}

async fn handle(
    State(mock): State<Arc<Mock>>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    mock.seen.lock().unwrap().push(Seen {
        path: uri.path().to_string(),
        api_key: headers
            .get("x-goog-api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });
    (mock.status, Json(mock.reply.clone()))
}

async fn spawn(status: StatusCode, reply: Value) -> (GeminiApi, Arc<Mock>) {
    let mock = Arc::new(Mock {
        status,
        reply,
        seen: Mutex::new(Vec::new()),
    });
    let app = Router::new().fallback(handle).with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let config = GeminiConfig::new("test-key").with_api_url(format!("http://{addr}"));
    (GeminiApi::new(config).unwrap(), mock)
}

fn png(width: u32, height: u32) -> ImagePayload {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([0, 0, 0, 0]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    ImagePayload::new("image/png", out.into_inner())
}

fn request() -> GenerationRequest {
    GenerationRequest {
        base: png(8, 4),
        overlays: vec![png(2, 2)],
        instruction: "integrate".to_string(),
        placement: None,
    }
}

fn image_reply(payload: &ImagePayload, text: &str) -> Value {
    json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    { "text": text },
                    { "inlineData": { "mimeType": "image/png", "data": payload.to_base64() } }
                ]
            },
            "finishReason": "STOP"
        }]
    })
}

// ---------------------------------------------------------------------------
// generate
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_posts_to_model_endpoint_with_key() {
    let edited = png(16, 8);
    let (api, mock) = spawn(StatusCode::OK, image_reply(&edited, "done")).await;

    let output = api.generate(&request()).await.unwrap();
    assert_eq!(output.image.bytes, edited.bytes);
    assert_eq!(output.text, "done");

    let seen = mock.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].path,
        "/v1beta/models/gemini-2.5-flash-image-preview:generateContent"
    );
    assert_eq!(seen[0].api_key.as_deref(), Some("test-key"));
    let parts = seen[0].body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[2]["text"], "integrate");
}

#[tokio::test]
async fn generator_trait_delegates_to_api() {
    let (api, mock) = spawn(StatusCode::OK, image_reply(&png(4, 4), "")).await;
    let generator: &dyn ImageGenerator = &api;
    generator.generate(&request()).await.unwrap();
    assert_eq!(mock.seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn service_error_message_is_surfaced() {
    let (api, _mock) = spawn(
        StatusCode::TOO_MANY_REQUESTS,
        json!({ "error": { "code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED" } }),
    )
    .await;

    assert_matches!(
        api.generate(&request()).await,
        Err(GeminiError::Service { status: Some(429), message }) if message == "Resource has been exhausted"
    );
}

#[tokio::test]
async fn text_only_reply_is_no_image_with_text() {
    let (api, _mock) = spawn(
        StatusCode::OK,
        json!({ "candidates": [{ "content": { "parts": [{ "text": "Cannot comply" }] } }] }),
    )
    .await;

    assert_matches!(
        api.generate(&request()).await,
        Err(GeminiError::NoImageReturned { text, .. }) if text == "Cannot comply"
    );
}

#[tokio::test]
async fn unreachable_service_is_a_service_error_without_status() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = GeminiApi::new(GeminiConfig::new("k").with_api_url(format!("http://{addr}"))).unwrap();
    assert_matches!(
        api.generate(&request()).await,
        Err(GeminiError::Service { status: None, .. })
    );
}

// ---------------------------------------------------------------------------
// generate_asset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn generate_asset_measures_output_and_omits_modalities() {
    let (api, mock) = spawn(StatusCode::OK, image_reply(&png(64, 32), "")).await;
    let req = AssetGenerationRequest::new("", "Aero / Spoilers & Wings", "GT wing", None).unwrap();

    let asset = api.generate_asset(&req).await.unwrap();
    assert_eq!(asset.size, Some(PixelSize::new(64, 32)));

    let seen = mock.seen.lock().unwrap();
    let body = &seen[0].body;
    assert!(body.get("generationConfig").is_none());
    let parts = body["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 1);
    assert!(parts[0]["text"]
        .as_str()
        .unwrap()
        .ends_with("Category: Aero / Spoilers & Wings\nRequest: GT wing"));
}

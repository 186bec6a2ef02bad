//! [`HttpBlobFetcher`] against an in-process blob server.

use std::io::Cursor;

use assert_matches::assert_matches;
use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;

use carmod_core::error::CoreError;
use carmod_core::payload::ImagePayload;
use carmod_pipeline::{BlobFetcher, HttpBlobFetcher};

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

async fn spawn() -> String {
    let app = Router::new()
        .route(
            "/typed.png",
            get(|| async { ([(header::CONTENT_TYPE, "image/png; charset=binary")], png_bytes()) }),
        )
        .route(
            "/untyped",
            get(|| async { ([(header::CONTENT_TYPE, "application/octet-stream")], png_bytes()) }),
        )
        .route("/empty.png", get(|| async { Vec::<u8>::new() }))
        .route("/forbidden.png", get(|| async { StatusCode::FORBIDDEN }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn declared_content_type_is_used() {
    let base = spawn().await;
    let payload = HttpBlobFetcher::new().fetch(&format!("{base}/typed.png")).await.unwrap();
    assert_eq!(payload.mime_type, "image/png");
    assert_eq!(payload.bytes, png_bytes());
}

#[tokio::test]
async fn non_image_content_type_is_sniffed() {
    let base = spawn().await;
    let payload = HttpBlobFetcher::new().fetch(&format!("{base}/untyped")).await.unwrap();
    assert_eq!(payload.mime_type, "image/png");
}

#[tokio::test]
async fn error_status_and_empty_body_are_transfer_errors() {
    let base = spawn().await;
    let fetcher = HttpBlobFetcher::new();
    assert_matches!(
        fetcher.fetch(&format!("{base}/forbidden.png")).await,
        Err(CoreError::Transfer(msg)) if msg.contains("403")
    );
    assert_matches!(
        fetcher.fetch(&format!("{base}/empty.png")).await,
        Err(CoreError::Transfer(_))
    );
}

#[tokio::test]
async fn data_urls_need_no_network() {
    let original = ImagePayload::new("image/webp", vec![5, 6, 7]);
    let payload = HttpBlobFetcher::new().fetch(&original.to_data_url()).await.unwrap();
    assert_eq!(payload, original);
}

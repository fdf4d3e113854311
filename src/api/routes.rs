use axum::{
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::auth::require_auth;
use crate::AppState;

/// Multipart framing on top of the image bytes
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize + MULTIPART_OVERHEAD;

    let protected = Router::new()
        // Images
        .route(
            "/upload-image",
            post(handlers::upload_image).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/get-images", get(handlers::get_images))
        .route("/delete-image/:id", delete(handlers::delete_image))
        // Data records
        .route("/saveuser", post(handlers::save_record))
        .route("/getusers", get(handlers::get_records))
        .route("/update", put(handlers::update_record))
        .route("/delete", delete(handlers::delete_record))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_auth,
        ));

    Router::new()
        // Accounts
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        // Stored objects (local and database backends)
        .route("/uploads/*key", get(handlers::serve_upload))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .merge(protected)
        .layer(cors_layer(&state.config.server.cors_allow_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allow_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    match allow_origin {
        "*" => layer.allow_origin(Any),
        origin => match origin.parse::<HeaderValue>() {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                tracing::warn!(origin, "Invalid CORS_ALLOW_ORIGIN, allowing any origin");
                layer.allow_origin(Any)
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body, Bytes};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use std::io::Cursor;
    use tower::ServiceExt;

    use crate::testutil::test_state;

    const BOUNDARY: &str = "salon-test-boundary";

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Bytes) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, body)
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn delete_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn upload_request(token: &str, field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload-image")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([1, 2, 3, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn message(body: &Bytes) -> String {
        let value: Value = serde_json::from_slice(body).unwrap();
        value["message"].as_str().unwrap_or_default().to_string()
    }

    async fn register_and_login(app: &Router, email: &str) -> String {
        let (status, _) = send(
            app,
            json_request(
                "POST",
                "/signup",
                None,
                json!({"name": "Test", "email": email, "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(
            app,
            json_request("POST", "/login", None, json!({"email": email, "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        value["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_signup_and_login_flow() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let signup = json!({"name": "Ann", "email": "a@x.com", "password": "pw"});
        let (status, _) = send(&app, json_request("POST", "/signup", None, signup.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = send(&app, json_request("POST", "/signup", None, signup)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), "Email already exists");

        let (status, body) = send(
            &app,
            json_request("POST", "/login", None, json!({"email": "a@x.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert!(value["token"].as_str().is_some());

        let (status, wrong_pw) = send(
            &app,
            json_request("POST", "/login", None, json!({"email": "a@x.com", "password": "nope"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, unknown) = send(
            &app,
            json_request("POST", "/login", None, json!({"email": "b@x.com", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message(&wrong_pw), message(&unknown));
    }

    #[tokio::test]
    async fn test_signup_requires_fields() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let (status, _) = send(
            &app,
            json_request("POST", "/signup", None, json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/signup",
                None,
                json!({"name": " ", "email": "a@x.com", "password": "pw"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), "name is required");
    }

    #[tokio::test]
    async fn test_protected_routes_require_token() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let (status, body) = send(&app, get_request("/get-images", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message(&body), "No token provided");

        let (status, body) = send(&app, get_request("/getusers", Some("not.a.token"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(message(&body), "Invalid token");
    }

    #[tokio::test]
    async fn test_upload_list_serve_delete() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));
        let ann = register_and_login(&app, "ann@x.com").await;
        let bob = register_and_login(&app, "bob@x.com").await;

        let original = png(400, 200);
        let (status, body) = send(&app, upload_request(&ann, "image", "cut.png", &original)).await;
        assert_eq!(status, StatusCode::OK);
        let uploaded: Value = serde_json::from_slice(&body).unwrap();
        let image_path = uploaded["image"].as_str().unwrap().to_string();
        let thumbnail_path = uploaded["thumbnail"].as_str().unwrap().to_string();
        assert!(image_path.starts_with("/uploads/"));
        assert!(thumbnail_path.starts_with("/uploads/thumbnail_"));

        let (status, body) = send(&app, get_request("/get-images", Some(&ann))).await;
        assert_eq!(status, StatusCode::OK);
        let images: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0]["path"], json!(image_path));
        let image_id = images[0]["id"].as_u64().unwrap();

        let (status, body) = send(&app, get_request(&image_path, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), original.as_slice());

        let (status, body) = send(&app, get_request(&thumbnail_path, None)).await;
        assert_eq!(status, StatusCode::OK);
        let thumb = image::load_from_memory(&body).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (200, 100));

        // Another user sees nothing and cannot delete
        let (_, body) = send(&app, get_request("/get-images", Some(&bob))).await;
        let images: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert!(images.is_empty());

        let uri = format!("/delete-image/{image_id}");
        let (status, _) = send(&app, delete_request(&uri, &bob)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, get_request(&image_path, None)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, delete_request(&uri, &ann)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, get_request(&image_path, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, get_request(&thumbnail_path, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_upload_without_image_field() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));
        let token = register_and_login(&app, "ann@x.com").await;

        let (status, body) = send(&app, upload_request(&token, "avatar", "a.png", &png(4, 4))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(message(&body), "No image uploaded");
    }

    #[tokio::test]
    async fn test_upload_too_large() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));
        let token = register_and_login(&app, "ann@x.com").await;

        let oversized = vec![0u8; 1024 * 1024 + 1];
        let (status, _) = send(&app, upload_request(&token, "image", "big.png", &oversized)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

        let (_, body) = send(&app, get_request("/get-images", Some(&token))).await;
        let images: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert!(images.is_empty());
    }

    #[tokio::test]
    async fn test_delete_image_bad_id() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));
        let token = register_and_login(&app, "ann@x.com").await;

        let (status, _) = send(&app, delete_request("/delete-image/abc", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, delete_request("/delete-image/42", &token)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_record_crud() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));
        let ann = register_and_login(&app, "ann@x.com").await;
        let bob = register_and_login(&app, "bob@x.com").await;

        let record = json!({
            "name": "Ann",
            "email": "ann@x.com",
            "phone": "555-0100",
            "service": "cut",
            "date": "2024-05-01T09:30:00Z",
        });
        let (status, body) = send(&app, json_request("POST", "/saveuser", Some(&ann), record)).await;
        assert_eq!(status, StatusCode::CREATED);
        let first: Value = serde_json::from_slice(&body).unwrap();
        let first_id = first["id"].as_u64().unwrap();
        assert_eq!(first["date"], json!("2024-05-01"));

        let second = json!({
            "name": "Ann",
            "email": "ann@x.com",
            "phone": "555-0100",
            "service": "color",
            "date": "2024-06-01",
        });
        send(&app, json_request("POST", "/saveuser", Some(&ann), second)).await;

        let (status, body) = send(&app, get_request("/getusers", Some(&ann))).await;
        assert_eq!(status, StatusCode::OK);
        let records: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["service"], json!("color"));
        assert_eq!(records[1]["id"], json!(first_id));

        let update = json!({
            "name": "Ann B",
            "email": "ann@x.com",
            "phone": "555-0199",
            "service": "cut",
            "date": "2024-05-02",
        });
        let uri = format!("/update?id={first_id}");
        let (status, _) = send(&app, json_request("PUT", &uri, Some(&bob), update.clone())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, json_request("PUT", &uri, Some(&ann), update)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get_request("/getusers", Some(&ann))).await;
        let records: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(records[1]["name"], json!("Ann B"));
        assert_eq!(records[1]["date"], json!("2024-05-02"));

        let (status, _) = send(&app, delete_request("/delete?id=999", &ann)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, delete_request("/delete?id=abc", &ann)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = send(&app, delete_request(&format!("/delete?id={first_id}"), &bob)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, delete_request(&format!("/delete?id={first_id}"), &ann)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get_request("/getusers", Some(&ann))).await;
        let records: Vec<Value> = serde_json::from_slice(&body).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = create_router(test_state(&dir));

        let (status, body) = send(&app, get_request("/_internal/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], json!("ok"));
    }
}

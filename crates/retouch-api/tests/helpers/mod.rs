//! Test helpers: build AppState and router for integration tests.
//!
//! Run with `cargo test -p retouch-api`.

pub mod fixtures;

use axum_test::TestServer;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use retouch_api::setup::routes;
use retouch_api::state::AppState;
use retouch_core::{Config, EngineConfig};
use retouch_processing::{decode, PixelBuffer};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Upload a PNG test card and return the new session id.
    pub async fn upload_card(&self, width: u32, height: u32) -> Uuid {
        let response = self
            .server
            .post("/upload")
            .multipart(fixtures::png_form(fixtures::create_test_png(width, height)))
            .await;
        response.assert_status_ok();
        let body: Value = response.json();
        body["image_id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("upload response has an image_id")
    }

    pub async fn process(&self, image_id: Uuid, operation: &str, params: Value) -> axum_test::TestResponse {
        self.server
            .post("/process")
            .json(&json!({ "image_id": image_id, "operation": operation, "params": params }))
            .await
    }

    pub async fn session(&self, image_id: Uuid) -> Value {
        let response = self.server.get(&format!("/session/{}", image_id)).await;
        response.assert_status_ok();
        response.json()
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        session_sweep_interval_secs: 0,
        ..EngineConfig::default()
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config())
}

pub fn setup_test_app_with(config: EngineConfig) -> TestApp {
    let config = Config::from(config);
    let state = Arc::new(AppState::new(config.clone()));
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to create test server");
    TestApp { server, state }
}

/// Decode the base64 PNG carried in a response's `image` field.
pub fn decode_image(body: &Value) -> PixelBuffer {
    let encoded = body["image"].as_str().expect("response has an image");
    let bytes = STANDARD.decode(encoded).expect("image is valid base64");
    decode(&bytes).expect("image is a valid PNG")
}

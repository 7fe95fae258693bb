//! Session lifecycle integration tests: upload, process, undo, reset.
//!
//! Run with: `cargo test -p retouch-api --test session_test`

mod helpers;

use helpers::fixtures::{create_test_png, image_form, png_form, test_card};
use helpers::{decode_image, setup_test_app};
use retouch_processing::PixelBuffer;
use serde_json::{json, Value};
use uuid::Uuid;

fn card_buffer(width: u32, height: u32) -> PixelBuffer {
    PixelBuffer::from_rgb(test_card(width, height))
}

#[tokio::test]
async fn test_upload_returns_session_metadata() {
    let app = setup_test_app();
    let response = app
        .client()
        .post("/upload")
        .multipart(png_form(create_test_png(40, 30)))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert!(Uuid::parse_str(body["image_id"].as_str().unwrap()).is_ok());
    assert_eq!(body["filename"], "card.png");
    assert_eq!(body["dimensions"], json!({ "width": 40, "height": 30 }));
    assert_eq!(body["channels"], 3);
    assert_eq!(decode_image(&body), card_buffer(40, 30));
    assert_eq!(app.state.sessions.len(), 1);
}

#[tokio::test]
async fn test_upload_accepts_first_file_field_without_image_name() {
    let app = setup_test_app();
    let form = axum_test::multipart::MultipartForm::new()
        .add_text("note", "hello")
        .add_part(
            "file",
            axum_test::multipart::Part::bytes(create_test_png(8, 8))
                .file_name("x.png")
                .mime_type("image/png"),
        );
    let response = app.client().post("/upload").multipart(form).await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_upload_without_file_is_rejected() {
    let app = setup_test_app();
    let form = axum_test::multipart::MultipartForm::new().add_text("note", "hello");
    let response = app.client().post("/upload").multipart(form).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_upload_rejects_unrecognized_bytes() {
    let app = setup_test_app();
    let response = app
        .client()
        .post("/upload")
        .multipart(image_form(b"definitely not an image".to_vec(), "a.png", "image/png"))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "UNSUPPORTED_FORMAT");
    assert!(app.state.sessions.is_empty());
}

#[tokio::test]
async fn test_upload_rejects_truncated_png() {
    let app = setup_test_app();
    let mut png = create_test_png(32, 32);
    png.truncate(60);
    let response = app.client().post("/upload").multipart(png_form(png)).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "CORRUPT_DATA");
}

#[tokio::test]
async fn test_upload_rejects_disallowed_extension() {
    let app = setup_test_app();
    let response = app
        .client()
        .post("/upload")
        .multipart(image_form(create_test_png(4, 4), "card.gif", "image/png"))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "UNSUPPORTED_FORMAT");
}

#[tokio::test]
async fn test_threshold_then_undo_restores_original() {
    let app = setup_test_app();
    let id = app.upload_card(100, 100).await;

    let response = app.process(id, "threshold", json!({ "value": 127 })).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["operation"], "threshold");
    assert_eq!(body["history_depth"], 1);
    assert_eq!(body["channels"], 1);
    let binary = decode_image(&body);
    assert!(binary.data().iter().all(|&v| v == 0 || v == 255));

    let response = app
        .client()
        .post("/undo")
        .json(&json!({ "image_id": id }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["undone"], true);
    assert_eq!(body["history_depth"], 0);
    assert_eq!(decode_image(&body), card_buffer(100, 100));
}

#[tokio::test]
async fn test_undo_with_empty_history_is_a_no_op() {
    let app = setup_test_app();
    let id = app.upload_card(10, 10).await;

    let response = app
        .client()
        .post("/undo")
        .json(&json!({ "image_id": id }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["undone"], false);
    assert_eq!(body["history_depth"], 0);
    assert_eq!(decode_image(&body), card_buffer(10, 10));
}

#[tokio::test]
async fn test_inverted_canny_thresholds_leave_session_unchanged() {
    let app = setup_test_app();
    let id = app.upload_card(30, 30).await;

    let response = app
        .process(id, "canny", json!({ "low": 150, "high": 50 }))
        .await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_PARAMETER");

    let session = app.session(id).await;
    assert_eq!(session["history_depth"], 0);
    assert_eq!(decode_image(&session), card_buffer(30, 30));
}

#[tokio::test]
async fn test_blur_kernel_must_be_odd() {
    let app = setup_test_app();
    let id = app.upload_card(25, 15).await;

    let response = app.process(id, "gaussian_blur", json!({ "intensity": 4 })).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "INVALID_PARAMETER");

    let response = app.process(id, "blur", json!({ "intensity": 5 })).await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["dimensions"], json!({ "width": 25, "height": 15 }));
    assert_eq!(body["operation"], "blur");
}

#[tokio::test]
async fn test_out_of_range_threshold_rejected() {
    let app = setup_test_app();
    let id = app.upload_card(8, 8).await;
    let response = app.process(id, "threshold", json!({ "value": -1 })).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "INVALID_PARAMETER");
}

#[tokio::test]
async fn test_numeric_strings_are_accepted() {
    let app = setup_test_app();
    let id = app.upload_card(8, 8).await;
    let response = app.process(id, "threshold", json!({ "value": "100" })).await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_grayscale_is_idempotent() {
    let app = setup_test_app();
    let id = app.upload_card(20, 20).await;

    let once: Value = app.process(id, "grayscale", json!({})).await.json();
    let twice: Value = app.process(id, "grayscale", json!({})).await.json();
    assert_eq!(once["channels"], 1);
    assert_eq!(decode_image(&once), decode_image(&twice));
    assert_eq!(twice["history_depth"], 2);
}

#[tokio::test]
async fn test_history_counts_only_successful_applies() {
    let app = setup_test_app();
    let id = app.upload_card(16, 16).await;

    app.process(id, "flip", json!({ "direction": "both" }))
        .await
        .assert_status_ok();
    assert_eq!(
        app.process(id, "flip", json!({ "direction": "sideways" }))
            .await
            .status_code(),
        400
    );
    app.process(id, "rotate", json!({ "angle": 90 }))
        .await
        .assert_status_ok();
    assert_eq!(
        app.process(id, "resize", json!({ "width": 0 })).await.status_code(),
        400
    );

    let session = app.session(id).await;
    assert_eq!(session["history_depth"], 2);
}

#[tokio::test]
async fn test_reset_restores_uploaded_image() {
    let app = setup_test_app();
    let id = app.upload_card(33, 21).await;

    for (op, params) in [
        ("rotate", json!({ "angle": 30 })),
        ("beautify", json!({})),
        ("resize", json!({ "width": 50, "height": 40 })),
    ] {
        app.process(id, op, params).await.assert_status_ok();
    }

    let response = app
        .client()
        .post("/reset")
        .json(&json!({ "image_id": id }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["history_depth"], 0);
    assert_eq!(body["dimensions"], json!({ "width": 33, "height": 21 }));
    assert_eq!(decode_image(&body), card_buffer(33, 21));
}

#[tokio::test]
async fn test_unknown_operation_and_unknown_session() {
    let app = setup_test_app();
    let id = app.upload_card(8, 8).await;

    let response = app.process(id, "sepia", json!({})).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "UNKNOWN_OPERATION");

    let response = app.process(Uuid::new_v4(), "grayscale", json!({})).await;
    assert_eq!(response.status_code(), 404);
    assert_eq!(response.json::<Value>()["code"], "NOT_FOUND");

    let response = app
        .client()
        .get(&format!("/session/{}", Uuid::new_v4()))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_unknown_parameter_rejected() {
    let app = setup_test_app();
    let id = app.upload_card(8, 8).await;
    let response = app.process(id, "grayscale", json!({ "strength": 2 })).await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "INVALID_PARAMETER");
}

#[tokio::test]
async fn test_malformed_body_is_invalid_input() {
    let app = setup_test_app();
    let response = app
        .client()
        .post("/process")
        .json(&json!({ "image_id": 42, "operation": "grayscale" }))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "INVALID_INPUT");
}

#[tokio::test]
async fn test_delete_session() {
    let app = setup_test_app();
    let id = app.upload_card(8, 8).await;

    let response = app.client().delete(&format!("/session/{}", id)).await;
    assert_eq!(response.status_code(), 204);
    assert!(app.state.sessions.is_empty());

    let response = app.client().delete(&format!("/session/{}", id)).await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_sessions_are_independent() {
    let app = setup_test_app();
    let a = app.upload_card(12, 12).await;
    let b = app.upload_card(12, 12).await;
    assert_ne!(a, b);

    app.process(a, "threshold", json!({})).await.assert_status_ok();

    let untouched = app.session(b).await;
    assert_eq!(untouched["history_depth"], 0);
    assert_eq!(decode_image(&untouched), card_buffer(12, 12));
}

#[tokio::test]
async fn test_rotation_angle_wraps() {
    let app = setup_test_app();
    let id = app.upload_card(12, 8).await;

    let wide: Value = app.process(id, "rotate", json!({ "angle": 1000 })).await.json();
    assert_eq!(wide["history_depth"], 1);
    app.client()
        .post("/undo")
        .json(&json!({ "image_id": id }))
        .await
        .assert_status_ok();

    let narrow: Value = app.process(id, "rotate", json!({ "angle": -80 })).await.json();
    assert_eq!(decode_image(&wide), decode_image(&narrow));
}

#[tokio::test]
async fn test_off_grid_smoothing_rejected() {
    let app = setup_test_app();
    let id = app.upload_card(8, 8).await;
    let response = app.process(id, "beautify", json!({ "smoothing": 12 })).await;
    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "INVALID_PARAMETER");
    assert!(body["error"].as_str().unwrap().contains("multiple of 5"));

    app.process(id, "beautify", json!({ "smoothing": 15 })).await.assert_status_ok();
}

// tests/integration/api_tests.rs
use actix_web::{
    http::{header::CONTENT_TYPE, StatusCode},
    middleware::from_fn,
    test, App,
};
use idgate::api::middleware::request_logger;
use serde_json::Value;

use crate::common::{
    blurry_png, multipart, sharp_png, Part, StubComparator, StubOcr, TestContext, BANNED_PREFIX,
};

macro_rules! app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .wrap(from_fn(request_logger))
                .configure($ctx.app.routes()),
        )
        .await
    };
}

fn post(uri: &str, parts: Vec<Part<'_>>) -> test::TestRequest {
    let (content_type, body) = multipart(parts);
    test::TestRequest::post()
        .uri(uri)
        .insert_header((CONTENT_TYPE, content_type))
        .set_payload(body)
}

#[test_log::test(actix_web::test)]
async fn test_match_returns_normalized_score() {
    let ctx = TestContext::new(StubComparator::with_distance(0.12), StubOcr::with_confidences(&[]));
    let app = app!(ctx);

    let req = post(
        "/match",
        vec![
            Part::png("selfie", sharp_png()),
            Part::png("id_image", sharp_png()),
            Part::text("user_id", "alice"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let score = body["matchScore"].as_f64().expect("matchScore missing");
    assert!((score - 0.8).abs() < 1e-9);
    assert_eq!(body["approved"], true);
    assert_eq!(ctx.leftover_artifacts(), 0);
}

#[actix_web::test]
async fn test_match_rejects_registered_user() {
    let ctx = TestContext::new(StubComparator::with_distance(0.1), StubOcr::with_confidences(&[]));
    let app = app!(ctx);

    for expected in [StatusCode::OK, StatusCode::BAD_REQUEST] {
        let req = post(
            "/match",
            vec![
                Part::png("selfie", sharp_png()),
                Part::png("id_image", sharp_png()),
                Part::text("user_id", "bob"),
            ],
        )
        .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected);

        if expected == StatusCode::BAD_REQUEST {
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "User already registered");
        }
    }
}

#[actix_web::test]
async fn test_match_missing_fields_is_bad_request() {
    let ctx = TestContext::new(StubComparator::with_distance(0.1), StubOcr::with_confidences(&[]));
    let app = app!(ctx);

    let req = post(
        "/match",
        vec![Part::png("selfie", sharp_png()), Part::text("user_id", "carol")],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing selfie, ID image, or user_id");
    assert_eq!(ctx.comparator.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_match_rejects_non_image_upload() {
    let ctx = TestContext::new(StubComparator::with_distance(0.1), StubOcr::with_confidences(&[]));
    let app = app!(ctx);

    let req = post(
        "/match",
        vec![
            Part::File {
                name: "selfie",
                filename: "selfie.pdf",
                content_type: "application/pdf",
                bytes: b"%PDF-1.4".to_vec(),
            },
            Part::png("id_image", sharp_png()),
            Part::text("user_id", "dave"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Only images allowed");
}

#[actix_web::test]
async fn test_match_blacklisted_selfie() {
    let banned = format!("{}.png", BANNED_PREFIX);
    let ctx = TestContext::with_blacklist(
        StubComparator::with_distance(0.1),
        StubOcr::with_confidences(&[]),
        &[banned.as_str()],
    );
    let app = app!(ctx);

    let req = post(
        "/match",
        vec![
            Part::png("selfie", sharp_png()),
            Part::png("id_image", sharp_png()),
            Part::text("user_id", "erin"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "User is blacklisted");
}

#[actix_web::test]
async fn test_ocr_returns_fields_and_confidence() {
    let ctx = TestContext::new(
        StubComparator::with_distance(0.1),
        StubOcr::with_confidences(&[80.0, 100.0, -1.0]),
    );
    let app = app!(ctx);

    let req = post(
        "/ocr",
        vec![
            Part::png("id_front", sharp_png()),
            Part::png("id_back", sharp_png()),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert!((body["confidence"].as_f64().unwrap() - 0.9).abs() < 1e-9);
    assert_eq!(body["fields"]["name"], "");
    assert_eq!(body["fields"]["idNumber"], "");
}

#[actix_web::test]
async fn test_ocr_blurry_front_is_rejected() {
    let ctx = TestContext::new(
        StubComparator::with_distance(0.1),
        StubOcr::with_confidences(&[90.0]),
    );
    let app = app!(ctx);

    let req = post(
        "/ocr",
        vec![
            Part::png("id_front", blurry_png()),
            Part::png("id_back", sharp_png()),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Low quality image: blurry");
    assert_eq!(ctx.leftover_artifacts(), 0);
}

#[actix_web::test]
async fn test_ocr_missing_back_is_bad_request() {
    let ctx = TestContext::new(
        StubComparator::with_distance(0.1),
        StubOcr::with_confidences(&[90.0]),
    );
    let app = app!(ctx);

    let req = post("/ocr", vec![Part::png("id_front", sharp_png())]).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Missing ID images");
}

#[actix_web::test]
async fn test_kyc_approves_clean_submission() {
    let ctx = TestContext::new(
        StubComparator::with_distance(0.06),
        StubOcr::with_confidences(&[95.0, 85.0]),
    );
    let app = app!(ctx);

    let req = post(
        "/kyc",
        vec![
            Part::png("id_front", sharp_png()),
            Part::png("id_back", sharp_png()),
            Part::png("selfie", sharp_png()),
            Part::text("user_id", "frank"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "approved");
    assert!((body["ocrConfidence"].as_f64().unwrap() - 0.9).abs() < 1e-9);
    assert!((body["matchScore"].as_f64().unwrap() - 0.9).abs() < 1e-9);
}

#[actix_web::test]
async fn test_kyc_low_document_confidence_needs_review() {
    let ctx = TestContext::new(
        StubComparator::with_distance(0.06),
        StubOcr::with_confidences(&[50.0]),
    );
    let app = app!(ctx);

    let req = post(
        "/kyc",
        vec![
            Part::png("id_front", sharp_png()),
            Part::png("id_back", sharp_png()),
            Part::png("selfie", sharp_png()),
            Part::text("user_id", "gina"),
        ],
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "needs_review");
    assert!(body.get("matchScore").is_none());
    assert_eq!(ctx.comparator.calls.load(std::sync::atomic::Ordering::SeqCst), 0);
}

#[actix_web::test]
async fn test_health_reports_request_counters() {
    let ctx = TestContext::new(StubComparator::with_distance(0.1), StubOcr::with_confidences(&[]));
    let app = app!(ctx);

    let bad = post("/ocr", vec![]).to_request();
    let resp = test::call_service(&app, bad).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["processedRequests"], 1);
    assert_eq!(body["failedRequests"], 1);
    assert_eq!(body["registeredUsers"], 0);
}

#[actix_web::test]
async fn test_match_ignores_unexpected_parts() {
    let ctx = TestContext::new(StubComparator::with_distance(0.12), StubOcr::with_confidences(&[]));
    let app = app!(ctx);

    let mut parts: Vec<Part<'_>> = (0..20).map(|_| Part::png("extra", sharp_png())).collect();
    parts.push(Part::png("selfie", sharp_png()));
    parts.push(Part::png("id_image", sharp_png()));
    parts.push(Part::text("user_id", "ivan"));
    parts.push(Part::text("comment", "hello"));

    let resp = test::call_service(&app, post("/match", parts).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(ctx.leftover_artifacts(), 0);
}

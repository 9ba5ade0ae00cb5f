// tests/integration/pipeline_tests.rs
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::future::join_all;
use idgate::{
    core::identity::types::{ImageUpload, VerificationRequest},
    utils::error::IdGateError,
};

use crate::common::{blurry_png, sharp_png, StubComparator, StubOcr, TestContext, BANNED_PREFIX};

fn request(user_id: &str) -> VerificationRequest {
    VerificationRequest::new(
        ImageUpload::new(sharp_png()),
        ImageUpload::new(sharp_png()),
        user_id,
    )
    .expect("valid request")
}

#[test_log::test(tokio::test)]
async fn test_approved_match_registers_user() {
    let ctx = TestContext::new(StubComparator::with_distance(0.12), StubOcr::with_confidences(&[]));
    let service = ctx.app.verification_service();

    let result = service.verify(request("alice")).await.expect("verification failed");

    assert!((result.normalized_score - 0.8).abs() < 1e-9);
    assert!(result.approved);
    assert!(ctx.app.registry().is_registered("alice").await.unwrap());

    // Artifacts must exist while the comparator reads them and be gone after.
    assert_eq!(ctx.comparator.missing_inputs.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.app.artifacts().live(), 0);
    assert_eq!(ctx.leftover_artifacts(), 0);
}

#[tokio::test]
async fn test_second_verification_is_already_registered() {
    let ctx = TestContext::new(StubComparator::with_distance(0.1), StubOcr::with_confidences(&[]));
    let service = ctx.app.verification_service();

    service.verify(request("bob")).await.expect("first verification failed");
    let calls_after_first = ctx.comparator.calls.load(Ordering::SeqCst);

    let second = service.verify(request("bob")).await;
    assert!(matches!(second, Err(IdGateError::AlreadyRegistered)));
    assert_eq!(ctx.comparator.calls.load(Ordering::SeqCst), calls_after_first);
}

#[tokio::test]
async fn test_rejected_match_does_not_register() {
    let ctx = TestContext::new(StubComparator::with_distance(0.3), StubOcr::with_confidences(&[]));
    let service = ctx.app.verification_service();

    let result = service.verify(request("carol")).await.expect("verification failed");

    assert!((result.normalized_score - 0.5).abs() < 1e-9);
    assert!(!result.approved);
    assert!(!ctx.app.registry().is_registered("carol").await.unwrap());
}

#[tokio::test]
async fn test_blacklisted_selfie_is_rejected() {
    let banned = format!("{}_01.png", BANNED_PREFIX);
    let ctx = TestContext::with_blacklist(
        StubComparator::with_distance(0.1),
        StubOcr::with_confidences(&[]),
        &["ref_a.png", banned.as_str(), "ref_z.png"],
    );
    assert_eq!(ctx.app.blacklist().len(), 3);

    let result = ctx.app.verification_service().verify(request("dave")).await;

    assert!(matches!(result, Err(IdGateError::Blacklisted)));
    assert!(!ctx.app.registry().is_registered("dave").await.unwrap());
    assert_eq!(ctx.leftover_artifacts(), 0);
}

#[tokio::test]
async fn test_non_matching_blacklist_lets_user_through() {
    let ctx = TestContext::with_blacklist(
        StubComparator::with_distance(0.1),
        StubOcr::with_confidences(&[]),
        &["ref_a.png", "ref_b.png"],
    );

    let result = ctx.app.verification_service().verify(request("erin")).await.unwrap();

    assert!(result.approved);
    // Two screening comparisons plus the selfie/ID comparison.
    assert_eq!(ctx.comparator.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_verifications_register_once() {
    let ctx = TestContext::new(
        StubComparator::with_distance(0.05).delayed(Duration::from_millis(20)),
        StubOcr::with_confidences(&[]),
    );
    let service = ctx.app.verification_service();

    let attempts = (0..8).map(|_| {
        let service = service.clone();
        tokio::spawn(async move { service.verify(request("frank")).await })
    });
    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.expect("verification task panicked"))
        .collect();

    let approved = results.iter().filter(|r| matches!(r, Ok(m) if m.approved)).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(IdGateError::AlreadyRegistered)))
        .count();

    assert_eq!(approved, 1);
    assert_eq!(duplicates, results.len() - 1);
    assert_eq!(ctx.app.registry().count().await.unwrap(), 1);
    assert_eq!(ctx.app.artifacts().live(), 0);
    assert_eq!(ctx.leftover_artifacts(), 0);
}

#[tokio::test]
async fn test_document_pipeline_scores_front_image() {
    let ctx = TestContext::new(
        StubComparator::with_distance(0.1),
        StubOcr::with_confidences(&[80.0, 100.0, -1.0]),
    );

    let outcome = ctx
        .app
        .document_service()
        .extract_document_data(ImageUpload::new(sharp_png()), ImageUpload::new(blurry_png()))
        .await
        .expect("extraction failed");

    assert!((outcome.confidence - 0.9).abs() < 1e-9);
    assert_eq!(outcome.fields.get("name").map(String::as_str), Some(""));
    assert_eq!(ctx.ocr.calls.load(Ordering::SeqCst), 1);
    assert_eq!(ctx.leftover_artifacts(), 0);
}

#[tokio::test]
async fn test_blurry_front_skips_ocr() {
    let ctx = TestContext::new(
        StubComparator::with_distance(0.1),
        StubOcr::with_confidences(&[90.0]),
    );

    let result = ctx
        .app
        .document_service()
        .extract_document_data(ImageUpload::new(blurry_png()), ImageUpload::new(sharp_png()))
        .await;

    assert!(matches!(result, Err(IdGateError::LowQualityImage)));
    assert_eq!(ctx.ocr.calls.load(Ordering::SeqCst), 0);
    assert_eq!(ctx.leftover_artifacts(), 0);
}

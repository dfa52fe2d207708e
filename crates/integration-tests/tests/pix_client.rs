//! PIX client against a local mock of the provider.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::Ordering;

use rust_decimal::Decimal;
use url::Url;

use pixstore_core::PixStatus;
use pixstore_integration_tests::{MockPix, UNREACHABLE_PIX, spawn_mock_pix, test_config};
use pixstore_storefront::services::pix::{PixClient, PixError};

async fn client_with_mock(mock: &Arc<MockPix>) -> PixClient {
    let base = spawn_mock_pix(Arc::clone(mock)).await;
    PixClient::new(&test_config(&base).pix).unwrap()
}

#[tokio::test]
async fn generate_sends_rounded_amount_and_client_id() {
    let mock = Arc::new(MockPix::default());
    let client = client_with_mock(&mock).await;

    let charge = client.generate(Decimal::new(56_805, 3)).await.unwrap();

    assert_eq!(charge.amount, Decimal::new(5681, 2));
    assert_eq!(charge.transaction_id, "9000");
    assert!(charge.qrcode.starts_with("000201"));

    let queries = mock.generate_queries.lock().unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0]["amount"], "56.81");
    assert_eq!(queries[0]["client_id"], "test-client");
}

#[tokio::test]
async fn generate_retries_until_provider_recovers() {
    let mock = Arc::new(MockPix::default());
    mock.fail_generates.store(2, Ordering::SeqCst);
    let client = client_with_mock(&mock).await;

    let charge = client.generate(Decimal::new(2990, 2)).await.unwrap();

    assert_eq!(mock.generate_calls.load(Ordering::SeqCst), 3);
    assert_eq!(charge.transaction_id, "9002");
}

#[tokio::test]
async fn generate_gives_up_after_configured_attempts() {
    let mock = Arc::new(MockPix::default());
    mock.fail_generates.store(10, Ordering::SeqCst);
    let client = client_with_mock(&mock).await;

    let err = client.generate(Decimal::new(2990, 2)).await.unwrap_err();

    assert!(matches!(err, PixError::Status(500)));
    assert_eq!(mock.generate_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn generate_reports_unreachable_provider() {
    let base = Url::parse(UNREACHABLE_PIX).unwrap();
    let client = PixClient::new(&test_config(&base).pix).unwrap();

    let err = client.generate(Decimal::new(2990, 2)).await.unwrap_err();
    assert!(matches!(err, PixError::Http(_)));
}

#[tokio::test]
async fn verify_maps_provider_statuses() {
    let mock = Arc::new(MockPix::default());
    let client = client_with_mock(&mock).await;
    let amount = Decimal::new(2990, 2);

    for (upstream, expected) in [
        ("PAID_OUT", PixStatus::Completed),
        ("COMPLETED", PixStatus::Completed),
        ("WAITING_FOR_APPROVAL", PixStatus::Pending),
        ("expired", PixStatus::Failed),
        ("CANCELLED", PixStatus::Failed),
        ("RETIDO", PixStatus::Retido),
        ("SOMETHING_NEW", PixStatus::Pending),
    ] {
        mock.set_status(upstream);
        let status = client.verify("9000", amount).await.unwrap();
        assert_eq!(status, expected, "{upstream}");
    }

    assert_eq!(mock.verify_calls.load(Ordering::SeqCst), 7);
}

// End-to-end poll cycles: HTTP fetch -> extraction -> email notification

use super::*;
use stock_watcher::events::{MonitorEvent, RecordingEventSink};
use stock_watcher::extractor::AvailabilityExtractor;
use stock_watcher::fetcher::HttpFetcher;
use stock_watcher::models::ProductRecord;
use stock_watcher::plugins::notifiers::{EmailKind, EmailNotifier};
use stock_watcher::plugins::traits::NotificationResult;
use stock_watcher::plugins::NotifierPlugin;
use stock_watcher::scheduler::{CycleOutcome, StockMonitor};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(body: String) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/product-category/graphics-card/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn category_url(server: &MockServer) -> String {
    format!("{}/product-category/graphics-card/", server.uri())
}

#[tokio::test]
async fn test_in_stock_product_sends_one_email() {
    let server = serve(listing_page("product")).await;
    let config = get_test_config(&category_url(&server));
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let transport = RecordingTransport::default();
    let notifier = EmailNotifier::new(&config.email, &transport, EmailKind::Restock);
    let sink = RecordingEventSink::new();

    let records = extractor.extract(&listing_page("product"));
    assert_eq!(records.len(), 1);
    assert!(records[0].in_stock);
    assert_eq!(records[0].name, PRODUCT_NAME);
    assert_eq!(records[0].detail_url.as_deref(), Some(PRODUCT_HREF));
    assert_eq!(records[0].price, PRODUCT_PRICE);

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        notifier,
        &sink,
    );
    let report = monitor.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.notified, 1);
    assert_eq!(transport.sent_count(), 1);

    let sent = transport.sent.lock().unwrap();
    let subject = sent[0].headers().get_raw("Subject").unwrap_or_default().to_string();
    assert!(subject.contains(PRODUCT_NAME));
    let recipients: Vec<String> = sent[0].envelope().to().iter().map(|a| a.to_string()).collect();
    assert_eq!(recipients, vec!["me@example.com".to_string()]);

    assert_eq!(
        sink.count(|e| matches!(e, MonitorEvent::NotificationSent { name, .. } if name == PRODUCT_NAME)),
        1
    );
}

#[tokio::test]
async fn test_outofstock_class_sends_nothing() {
    let server = serve(listing_page("product outofstock")).await;
    let config = get_test_config(&category_url(&server));
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let transport = RecordingTransport::default();
    let sink = RecordingEventSink::new();

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        EmailNotifier::new(&config.email, &transport, EmailKind::Restock),
        &sink,
    );
    let report = monitor.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::Completed);
    assert_eq!(report.out_of_stock, 1);
    assert_eq!(transport.sent_count(), 0);
    assert_eq!(
        sink.count(|e| *e == MonitorEvent::OutOfStock { name: PRODUCT_NAME.to_string() }),
        1
    );
}

#[tokio::test]
async fn test_empty_listing_warns_without_error() {
    let server = serve(empty_listing_page()).await;
    let config = get_test_config(&category_url(&server));
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let transport = RecordingTransport::default();
    let sink = RecordingEventSink::new();

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        EmailNotifier::new(&config.email, &transport, EmailKind::Restock),
        &sink,
    );
    let report = monitor.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::NoProducts);
    assert_eq!(transport.sent_count(), 0);
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::NoProductsFound { .. })), 1);
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::FetchFailed { .. })), 0);
}

#[tokio::test]
async fn test_network_error_skips_extraction_and_notification() {
    let config = get_test_config("http://127.0.0.1:1/product-category/graphics-card/");
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let transport = RecordingTransport::default();
    let sink = RecordingEventSink::new();

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        EmailNotifier::new(&config.email, &transport, EmailKind::Restock),
        &sink,
    );
    let report = monitor.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::FetchFailed);
    assert_eq!(transport.sent_count(), 0);
    assert_eq!(
        sink.events()
            .iter()
            .filter(|e| !matches!(e, MonitorEvent::FetchFailed { .. }))
            .count(),
        0
    );
}

#[tokio::test]
async fn test_server_error_status_is_a_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let config = get_test_config(&category_url(&server));
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let transport = RecordingTransport::default();
    let sink = RecordingEventSink::new();

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        EmailNotifier::new(&config.email, &transport, EmailKind::Restock),
        &sink,
    );
    let report = monitor.run_cycle().await;

    assert_eq!(report.outcome, CycleOutcome::FetchFailed);
    assert!(sink.events().iter().any(
        |e| matches!(e, MonitorEvent::FetchFailed { error, .. } if error.contains("503"))
    ));
}

#[tokio::test]
async fn test_missing_password_fails_without_sending() {
    let server = serve(listing_page("product")).await;
    let mut config = get_test_config(&category_url(&server));
    config.email.password = None;
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let transport = RecordingTransport::default();
    let sink = RecordingEventSink::new();

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        EmailNotifier::new(&config.email, &transport, EmailKind::Restock),
        &sink,
    );
    let report = monitor.run_cycle().await;

    assert_eq!(report.failed_notifications, 1);
    assert_eq!(transport.sent_count(), 0);
    assert!(sink.events().iter().any(
        |e| matches!(e, MonitorEvent::NotificationFailed { error, .. } if error.contains("EMAIL_PASSWORD"))
    ));
}

#[tokio::test]
async fn test_transport_failure_is_recoverable() {
    let server = serve(listing_page("product")).await;
    let config = get_test_config(&category_url(&server));
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let transport = RecordingTransport::failing("535 5.7.8 Username and Password not accepted");
    let sink = RecordingEventSink::new();

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        EmailNotifier::new(&config.email, &transport, EmailKind::Restock),
        &sink,
    );

    // Each cycle makes exactly one attempt; a later cycle tries again.
    for _ in 0..2 {
        let report = monitor.run_cycle().await;
        assert_eq!(report.outcome, CycleOutcome::Completed);
        assert_eq!(report.failed_notifications, 1);
    }
    assert_eq!(sink.count(|e| matches!(e, MonitorEvent::NotificationFailed { .. })), 2);
}

#[tokio::test]
async fn test_stateless_polling_renotifies_each_cycle() {
    let server = serve(listing_page("product")).await;
    let config = get_test_config(&category_url(&server));
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let transport = RecordingTransport::default();
    let sink = RecordingEventSink::new();

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        EmailNotifier::new(&config.email, &transport, EmailKind::Restock),
        &sink,
    );
    monitor.run_cycle().await;
    monitor.run_cycle().await;

    assert_eq!(transport.sent_count(), 2);
}

#[tokio::test]
async fn test_test_mode_sends_without_fetching() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let config = get_test_config(&category_url(&server));
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let transport = RecordingTransport::default();
    let sink = RecordingEventSink::new();

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        EmailNotifier::new(&config.email, &transport, EmailKind::Test),
        &sink,
    );

    assert!(monitor.run_test_notification().await);
    assert_eq!(transport.sent_count(), 1);
    let sent = transport.sent.lock().unwrap();
    let subject = sent[0].headers().get_raw("Subject").unwrap_or_default().to_string();
    assert!(subject.starts_with("[TEST]"));
}

/// Notifier that keeps the records it was asked to announce.
#[derive(Default)]
struct CapturingNotifier {
    records: std::sync::Mutex<Vec<ProductRecord>>,
}

#[async_trait::async_trait]
impl NotifierPlugin for &CapturingNotifier {
    async fn notify(&self, record: &ProductRecord) -> stock_watcher::Result<NotificationResult> {
        self.records.lock().unwrap().push(record.clone());
        Ok(NotificationResult {
            message_id: "email-1".to_string(),
            recipient: "me@example.com".to_string(),
            sent_at: chrono::Utc::now(),
        })
    }

    async fn test_connection(&self) -> stock_watcher::Result<bool> {
        Ok(true)
    }
}

#[tokio::test]
async fn test_relative_product_link_is_made_absolute() {
    let server = serve(listing_page("product")).await;
    let config = get_test_config(&category_url(&server));
    let extractor = AvailabilityExtractor::new(&config.selectors).unwrap();
    let notifier = CapturingNotifier::default();
    let sink = RecordingEventSink::new();

    let monitor = StockMonitor::new(
        &config.monitor,
        &extractor,
        HttpFetcher::new(&config.monitor).unwrap(),
        &notifier,
        &sink,
    );
    monitor.run_cycle().await;

    let records = notifier.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(
        records[0].detail_url.as_deref(),
        Some(format!("{}{}", server.uri(), PRODUCT_HREF).as_str())
    );
}

use std::future::Future;
use url::Url;

use crate::config::MonitorConfig;
use crate::events::{EventSink, MonitorEvent, MonitorState};
use crate::extractor::AvailabilityExtractor;
use crate::fetcher::PageFetcher;
use crate::models::{sample_restock, Disposition, ProductRecord};
use crate::plugins::NotifierPlugin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The page could not be fetched; nothing was extracted.
    FetchFailed,
    /// The page was fetched but no named products were found.
    NoProducts,
    Completed,
}

/// Summary of one fetch-extract-evaluate-notify pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub products_seen: usize,
    pub out_of_stock: usize,
    pub missing_detail_url: usize,
    pub notified: usize,
    pub failed_notifications: usize,
}

impl CycleReport {
    fn new(outcome: CycleOutcome) -> Self {
        Self {
            outcome,
            products_seen: 0,
            out_of_stock: 0,
            missing_detail_url: 0,
            notified: 0,
            failed_notifications: 0,
        }
    }
}

/// Polls one listing page on a fixed interval and notifies on in-stock items.
///
/// Cycles never overlap: the next fetch starts only after the previous cycle
/// and the following sleep have both finished. Every per-cycle failure is
/// reported through the event sink and the loop carries on.
pub struct StockMonitor<'a, F, N, E> {
    config: &'a MonitorConfig,
    extractor: &'a AvailabilityExtractor,
    fetcher: F,
    notifier: N,
    events: E,
}

impl<'a, F, N, E> StockMonitor<'a, F, N, E>
where
    F: PageFetcher,
    N: NotifierPlugin,
    E: EventSink,
{
    pub fn new(
        config: &'a MonitorConfig,
        extractor: &'a AvailabilityExtractor,
        fetcher: F,
        notifier: N,
        events: E,
    ) -> Self {
        Self {
            config,
            extractor,
            fetcher,
            notifier,
            events,
        }
    }

    /// Run cycles until `shutdown` resolves. Shutdown is honoured both while
    /// a cycle is in flight and while sleeping.
    pub async fn run<S>(&self, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.events.emit(&MonitorEvent::Started {
            url: self.config.url.clone(),
            test_mode: false,
        });

        loop {
            self.events.emit(&MonitorEvent::StateChanged(MonitorState::Polling));
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                report = self.run_cycle() => {
                    tracing::debug!(?report, "Stock check finished");
                }
            }

            let interval = self.config.interval();
            self.events.emit(&MonitorEvent::StateChanged(MonitorState::Sleeping { interval }));
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        self.events.emit(&MonitorEvent::StateChanged(MonitorState::Stopped));
    }

    pub async fn run_cycle(&self) -> CycleReport {
        let markup = match self.fetcher.fetch(&self.config.url).await {
            Ok(markup) => markup,
            Err(e) => {
                self.events.emit(&MonitorEvent::FetchFailed {
                    url: self.config.url.clone(),
                    error: e.to_string(),
                });
                return CycleReport::new(CycleOutcome::FetchFailed);
            }
        };

        let extraction = self.extractor.extract_with_report(&markup);
        if extraction.unnamed_items > 0 {
            self.events.emit(&MonitorEvent::UnnamedItemsSkipped {
                count: extraction.unnamed_items,
            });
        }

        if extraction.records.is_empty() {
            self.events.emit(&MonitorEvent::NoProductsFound {
                url: self.config.url.clone(),
            });
            return CycleReport::new(CycleOutcome::NoProducts);
        }

        let base = Url::parse(&self.config.url).ok();
        let mut report = CycleReport::new(CycleOutcome::Completed);
        report.products_seen = extraction.records.len();
        for mut record in extraction.records {
            if let Some(base) = &base {
                record.resolve_detail_url(base);
            }
            self.evaluate(&record, &mut report).await;
        }
        report
    }

    async fn evaluate(&self, record: &ProductRecord, report: &mut CycleReport) {
        match record.disposition() {
            Disposition::Notify { .. } => {
                self.events.emit(&MonitorEvent::InStock { name: record.name.clone() });
                if self.send(record).await {
                    report.notified += 1;
                } else {
                    report.failed_notifications += 1;
                }
            }
            Disposition::MissingDetailUrl => {
                self.events.emit(&MonitorEvent::InStock { name: record.name.clone() });
                self.events.emit(&MonitorEvent::MissingDetailUrl { name: record.name.clone() });
                report.missing_detail_url += 1;
            }
            Disposition::OutOfStock => {
                self.events.emit(&MonitorEvent::OutOfStock { name: record.name.clone() });
                report.out_of_stock += 1;
            }
        }
    }

    async fn send(&self, record: &ProductRecord) -> bool {
        match self.notifier.notify(record).await {
            Ok(result) => {
                self.events.emit(&MonitorEvent::NotificationSent {
                    name: record.name.clone(),
                    message_id: result.message_id,
                });
                true
            }
            Err(e) => {
                self.events.emit(&MonitorEvent::NotificationFailed {
                    name: record.name.clone(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Send one notification for a synthetic in-stock product without
    /// fetching the page.
    pub async fn run_test_notification(&self) -> bool {
        self.events.emit(&MonitorEvent::Started {
            url: self.config.url.clone(),
            test_mode: true,
        });
        let success = self.send(&sample_restock()).await;
        self.events.emit(&MonitorEvent::TestFinished { success });
        success
    }
}

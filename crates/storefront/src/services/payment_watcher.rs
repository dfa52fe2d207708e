//! Background payment reconciliation.
//!
//! Customers poll their own order while the payment page is open. The
//! watcher covers everyone who closed the tab: on every tick it verifies
//! each pending charge with the provider, fulfilling paid orders and
//! cancelling the ones whose window closed unpaid.

use std::time::Duration;

use sqlx::PgPool;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use pixstore_core::OrderStatus;

use crate::db::{OrderRepository, RepositoryError};
use crate::services::checkout::CheckoutService;
use crate::services::events::EventBus;
use crate::services::pix::PixClient;

/// What one pass of the watcher did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WatchReport {
    pub checked: usize,
    pub fulfilled: usize,
    pub cancelled: usize,
}

/// Periodic reconciliation of pending orders.
#[derive(Clone)]
pub struct PaymentWatcher {
    pool: PgPool,
    pix: PixClient,
    events: EventBus,
    interval: Duration,
    payment_window: Duration,
}

impl PaymentWatcher {
    #[must_use]
    pub const fn new(
        pool: PgPool,
        pix: PixClient,
        events: EventBus,
        interval: Duration,
        payment_window: Duration,
    ) -> Self {
        Self {
            pool,
            pix,
            events,
            interval,
            payment_window,
        }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(interval_secs = self.interval.as_secs(), "payment watcher started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.run_once().await {
                            Ok(report) if report != WatchReport::default() => {
                                tracing::info!(
                                    checked = report.checked,
                                    fulfilled = report.fulfilled,
                                    cancelled = report.cancelled,
                                    "payment watcher pass"
                                );
                            }
                            Ok(_) => {}
                            Err(e) => tracing::error!(error = %e, "payment watcher pass failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::info!("payment watcher stopped");
        })
    }

    /// One reconciliation pass.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if listing orders fails. Failures on a
    /// single order are logged and skipped.
    pub async fn run_once(&self) -> Result<WatchReport, RepositoryError> {
        let orders = OrderRepository::new(&self.pool);
        let mut report = WatchReport::default();

        let checkout =
            CheckoutService::new(&self.pool, &self.pix, &self.events, self.payment_window);
        for order in orders.list_pending_with_charge().await? {
            let order_id = order.id;
            report.checked += 1;
            match checkout.reconcile(order).await {
                Ok(status) if status.order.status.is_paid() => report.fulfilled += 1,
                Ok(status) if status.order.status == OrderStatus::Cancelled => {
                    report.cancelled += 1;
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(%order_id, error = %e, "failed to reconcile order"),
            }
        }

        Ok(report)
    }
}

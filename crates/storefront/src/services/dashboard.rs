//! Back-office dashboard metrics.
//!
//! Day boundaries are UTC midnights. Weeks start on Sunday.

use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use pixstore_core::OrderStatus;

use crate::models::Order;

/// Longest custom range the dashboard will chart.
pub const MAX_CUSTOM_DAYS: i64 = 366;

/// Reporting period selected in the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Week,
    Month,
    Custom {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

/// Half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardMetrics {
    pub total_orders: usize,
    pub new_customers: usize,
    pub pending_orders: usize,
    pub paid_orders: usize,
    pub total_revenue: Decimal,
}

/// One day of the dashboard chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    /// `dd/MM`
    pub date: String,
    pub orders: usize,
    pub revenue: Decimal,
    pub customers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub range: DateRange,
    pub metrics: DashboardMetrics,
    pub chart: Vec<ChartPoint>,
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

impl Period {
    /// Parse the dashboard query parameters. A missing period means `week`.
    ///
    /// # Errors
    ///
    /// Returns a message for unknown periods, or custom ranges that end
    /// before they start or span more than [`MAX_CUSTOM_DAYS`].
    pub fn from_query(
        period: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, String> {
        match period.unwrap_or("week") {
            "today" => Ok(Self::Today),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "custom" => {
                if let (Some(s), Some(e)) = (start, end) {
                    if e < s {
                        return Err("end date is before start date".to_string());
                    }
                    if (e - s).num_days() >= MAX_CUSTOM_DAYS {
                        return Err(format!("custom range is limited to {MAX_CUSTOM_DAYS} days"));
                    }
                }
                Ok(Self::Custom { start, end })
            }
            other => Err(format!("unknown period: {other}")),
        }
    }

    /// Concrete time range for this period as seen at `now`.
    #[must_use]
    pub fn range(self, now: DateTime<Utc>) -> DateRange {
        let today = now.date_naive();
        match self {
            Self::Today => DateRange {
                start: midnight(today),
                end: midnight(today) + Duration::days(1),
            },
            Self::Week => {
                let start =
                    today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
                DateRange {
                    start: midnight(start),
                    end: midnight(start) + Duration::days(7),
                }
            }
            Self::Month => {
                let first = today.with_day(1).unwrap_or(today);
                let next = first
                    .checked_add_months(Months::new(1))
                    .unwrap_or_else(|| first + Duration::days(31));
                DateRange {
                    start: midnight(first),
                    end: midnight(next),
                }
            }
            Self::Custom { start, end } => DateRange {
                start: start.map_or_else(|| now - Duration::days(7), midnight),
                end: end.map_or(now, |d| midnight(d) + Duration::days(1)),
            },
        }
    }
}

fn counts_as_revenue(status: OrderStatus) -> bool {
    !matches!(status, OrderStatus::Pending | OrderStatus::Cancelled)
}

/// Compute headline metrics and the per-day chart.
///
/// `orders` and `signups` are expected to already fall inside `range`;
/// anything outside is ignored by the chart but still counted in the
/// headline metrics.
#[must_use]
pub fn summarize(orders: &[Order], signups: &[DateTime<Utc>], range: DateRange) -> Dashboard {
    let metrics = DashboardMetrics {
        total_orders: orders.len(),
        new_customers: signups.len(),
        pending_orders: orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count(),
        paid_orders: orders.iter().filter(|o| o.status.is_paid()).count(),
        total_revenue: orders
            .iter()
            .filter(|o| counts_as_revenue(o.status))
            .map(|o| o.total)
            .sum(),
    };

    let mut chart = Vec::new();
    let mut day = range.start.date_naive();
    while midnight(day) < range.end {
        let day_start = midnight(day);
        let day_end = day_start + Duration::days(1);
        let in_day = |at: &DateTime<Utc>| *at >= day_start && *at < day_end;

        let day_orders: Vec<&Order> = orders.iter().filter(|o| in_day(&o.created_at)).collect();
        chart.push(ChartPoint {
            date: day.format("%d/%m").to_string(),
            orders: day_orders.len(),
            revenue: day_orders
                .iter()
                .filter(|o| counts_as_revenue(o.status))
                .map(|o| o.total)
                .sum(),
            customers: signups.iter().filter(|at| in_day(at)).count(),
        });

        let Some(next) = day.succ_opt() else { break };
        day = next;
    }

    Dashboard {
        range,
        metrics,
        chart,
    }
}

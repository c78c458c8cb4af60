//! Monthly booking, revenue and occupancy aggregation.
//!
//! Nights are counted on calendar dates. A month covers
//! `[first day, first day of next month)`, so a stay departing on the 1st
//! contributes nothing to the month it leaves.

use crate::models::{Booking, MonthlyMetrics};
use crate::permissions::{is_allowed, Action, Role};
use chrono::{Datelike, Months, NaiveDate};
use tracing::{debug, warn};

const FALLBACK_DAYS_IN_MONTH: i64 = 30;

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Parse `YYYY-MM`
    pub fn parse(raw: &str) -> Option<Self> {
        let (year, month) = raw.trim().split_once('-')?;
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First day of the following month (exclusive end)
    pub fn next_first_day(&self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn next(&self) -> Self {
        let next = self.next_first_day();
        Self {
            year: next.year(),
            month: next.month(),
        }
    }

    /// Last day of the month
    pub fn last_day(&self) -> NaiveDate {
        self.next_first_day().pred_opt().unwrap_or(self.first_day())
    }

    pub fn days(&self) -> i64 {
        (self.next_first_day() - self.first_day()).num_days()
    }

    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Aggregate bookings that overlap `month`.
///
/// Overlapping bookings count once each. Rent is prorated by the share of the
/// stay's nights falling inside the month. Bookings with unparsable dates are
/// skipped; zero-length or inverted stays count but add no nights or revenue.
pub fn compute_monthly(
    bookings: &[Booking],
    month: YearMonth,
    total_properties: u32,
) -> MonthlyMetrics {
    let month_start = month.first_day();
    let month_end = month.next_first_day();

    let mut bookings_count: u32 = 0;
    let mut nights: i64 = 0;
    let mut revenue = 0.0;

    for booking in bookings {
        let (Some(arrival), Some(departure)) = (booking.arrival_date(), booking.departure_date())
        else {
            warn!(
                "Skipping booking {} with unparsable dates ({:?} to {:?})",
                booking.id, booking.arrival, booking.departure
            );
            continue;
        };

        if arrival >= month_end || departure <= month_start {
            continue;
        }

        bookings_count += 1;

        let stay_nights = (departure - arrival).num_days();
        if stay_nights <= 0 {
            debug!("Booking {} has no nights, counted without revenue", booking.id);
            continue;
        }

        let overlap_start = arrival.max(month_start);
        let overlap_end = departure.min(month_end);
        let overlap_nights = (overlap_end - overlap_start).num_days().max(0);

        nights += overlap_nights;
        revenue += (overlap_nights as f64 / stay_nights as f64) * booking.rent();
    }

    MonthlyMetrics {
        month: month.label(),
        bookings_count,
        revenue: Some(revenue),
        occupancy: occupancy(nights, total_properties, month.days()),
        nights,
    }
}

/// Metrics for `months` consecutive months starting at `first`
pub fn compute_range(
    bookings: &[Booking],
    first: YearMonth,
    months: u32,
    total_properties: u32,
) -> Vec<MonthlyMetrics> {
    let mut current = first;
    let mut series = Vec::with_capacity(months as usize);
    for _ in 0..months {
        series.push(compute_monthly(bookings, current, total_properties));
        current = current.next();
    }
    series
}

/// Booked share of available property-nights, as a percentage
pub fn occupancy(nights: i64, total_properties: u32, days_in_month: i64) -> f64 {
    let days = if days_in_month > 0 {
        days_in_month
    } else {
        FALLBACK_DAYS_IN_MONTH
    };
    let available = total_properties as i64 * days;
    if available == 0 {
        return 0.0;
    }
    nights as f64 / available as f64 * 100.0
}

impl MonthlyMetrics {
    /// Drop revenue unless `role` may see it
    pub fn redacted_for(mut self, role: Role) -> Self {
        if !is_allowed(role, Action::ViewRevenue) {
            self.revenue = None;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Charge;

    fn stay(id: i64, arrival: &str, departure: &str, rent: f64) -> Booking {
        Booking {
            id,
            property_id: Some(1),
            arrival: Some(arrival.to_string()),
            departure: Some(departure.to_string()),
            charges: vec![
                Charge {
                    amount: rent,
                    kind: "rent".to_string(),
                },
                Charge {
                    amount: 99.0,
                    kind: "tax".to_string(),
                },
            ],
            listing_site: None,
            total_amount: None,
        }
    }

    fn march() -> YearMonth {
        YearMonth::new(2024, 3).unwrap()
    }

    #[test]
    fn test_year_month_bounds() {
        let feb = YearMonth::parse("2024-02").unwrap();
        assert_eq!(feb.days(), 29);
        assert_eq!(feb.last_day(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert_eq!(YearMonth::parse("2023-12").unwrap().next(), YearMonth::new(2024, 1).unwrap());
        assert!(YearMonth::parse("2024-13").is_none());
        assert!(YearMonth::parse("March").is_none());
        assert_eq!(march().label(), "2024-03");
    }

    #[test]
    fn test_stay_inside_month() {
        let bookings = vec![stay(1, "2024-03-01", "2024-03-06", 500.0)];
        let metrics = compute_monthly(&bookings, march(), 1);

        assert_eq!(metrics.bookings_count, 1);
        assert_eq!(metrics.nights, 5);
        assert_eq!(metrics.revenue, Some(500.0));
    }

    #[test]
    fn test_stay_split_evenly_across_months() {
        let bookings = vec![stay(1, "2024-02-25", "2024-03-06", 1000.0)];

        let feb = compute_monthly(&bookings, YearMonth::new(2024, 2).unwrap(), 1);
        let mar = compute_monthly(&bookings, march(), 1);

        assert_eq!(feb.nights, 5);
        assert_eq!(mar.nights, 5);
        assert_eq!(feb.revenue, Some(500.0));
        assert_eq!(mar.revenue, Some(500.0));
        assert_eq!(feb.bookings_count, 1);
        assert_eq!(mar.bookings_count, 1);
    }

    #[test]
    fn test_non_overlapping_stays_ignored() {
        let bookings = vec![
            stay(1, "2024-02-20", "2024-03-01", 800.0),
            stay(2, "2024-04-01", "2024-04-05", 400.0),
            stay(3, "2023-03-10", "2023-03-12", 200.0),
        ];
        let metrics = compute_monthly(&bookings, march(), 1);

        assert_eq!(metrics.bookings_count, 0);
        assert_eq!(metrics.nights, 0);
        assert_eq!(metrics.revenue, Some(0.0));
        assert_eq!(metrics.occupancy, 0.0);
    }

    #[test]
    fn test_malformed_dates_skipped() {
        let bookings = vec![
            stay(1, "garbage", "2024-03-06", 500.0),
            stay(2, "2024-03-10", "2024-03-12", 200.0),
        ];
        let metrics = compute_monthly(&bookings, march(), 1);

        assert_eq!(metrics.bookings_count, 1);
        assert_eq!(metrics.nights, 2);
        assert_eq!(metrics.revenue, Some(200.0));
    }

    #[test]
    fn test_null_dates_from_upstream_skipped() {
        let bookings: Vec<Booking> = serde_json::from_str(
            r#"[
                {"id": 1, "arrival": null, "departure": "2024-03-06",
                 "charges": [{"amount": 500.0, "type": "rent"}]},
                {"id": 2, "arrival": "2024-03-10", "departure": "2024-03-12",
                 "charges": [{"amount": 200.0, "type": "rent"}]}
            ]"#,
        )
        .unwrap();
        let metrics = compute_monthly(&bookings, march(), 1);

        assert_eq!(metrics.bookings_count, 1);
        assert_eq!(metrics.nights, 2);
        assert_eq!(metrics.revenue, Some(200.0));
    }

    #[test]
    fn test_zero_night_stay_counts_without_revenue() {
        let bookings = vec![
            stay(1, "2024-03-10", "2024-03-10", 300.0),
            stay(2, "2024-03-12", "2024-03-11", 300.0),
        ];
        let metrics = compute_monthly(&bookings, march(), 1);

        assert_eq!(metrics.bookings_count, 2);
        assert_eq!(metrics.nights, 0);
        assert_eq!(metrics.revenue, Some(0.0));
    }

    #[test]
    fn test_occupancy_over_inventory() {
        let bookings = vec![
            stay(1, "2024-03-01", "2024-03-11", 1000.0),
            stay(2, "2024-03-15", "2024-03-20", 500.0),
        ];
        let metrics = compute_monthly(&bookings, march(), 2);

        assert_eq!(metrics.nights, 15);
        let expected = 15.0 / (2.0 * 31.0) * 100.0;
        assert!((metrics.occupancy - expected).abs() < 1e-9);
    }

    #[test]
    fn test_occupancy_monotonic_in_nights() {
        let mut previous = -1.0;
        for nights in 0..=62 {
            let value = occupancy(nights, 2, 31);
            assert!(value >= previous);
            previous = value;
        }
        assert_eq!(occupancy(62, 2, 31), 100.0);
    }

    #[test]
    fn test_occupancy_guards() {
        assert_eq!(occupancy(10, 0, 31), 0.0);
        assert_eq!(occupancy(15, 1, 0), 50.0);
    }

    #[test]
    fn test_timestamps_with_times_use_calendar_nights() {
        let bookings = vec![stay(1, "2024-03-01T16:00:00Z", "2024-03-04T10:00:00Z", 300.0)];
        let metrics = compute_monthly(&bookings, march(), 1);
        assert_eq!(metrics.nights, 3);
        assert_eq!(metrics.revenue, Some(300.0));
    }

    #[test]
    fn test_compute_range_series() {
        let bookings = vec![stay(1, "2024-01-29", "2024-02-03", 500.0)];
        let series = compute_range(&bookings, YearMonth::new(2024, 1).unwrap(), 3, 1);

        let labels: Vec<&str> = series.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(labels, vec!["2024-01", "2024-02", "2024-03"]);
        assert_eq!(series[0].nights, 3);
        assert_eq!(series[1].nights, 2);
        assert_eq!(series[2].bookings_count, 0);
        assert_eq!(series[0].revenue, Some(300.0));
        assert_eq!(series[1].revenue, Some(200.0));
    }

    #[test]
    fn test_revenue_redacted_for_unprivileged_roles() {
        let bookings = vec![stay(1, "2024-03-01", "2024-03-06", 500.0)];
        let metrics = compute_monthly(&bookings, march(), 1);

        assert_eq!(metrics.clone().redacted_for(Role::Superadmin).revenue, Some(500.0));
        assert_eq!(metrics.clone().redacted_for(Role::Admin).revenue, Some(500.0));
        assert_eq!(metrics.redacted_for(Role::User).revenue, None);
    }
}

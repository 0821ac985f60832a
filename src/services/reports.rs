//! Reporting and dashboard service

use chrono::{Datelike, NaiveDate};
use sqlx::Row;

use crate::{
    api::reports::{DashboardSummary, MonthlyTrend},
    error::AppResult,
    models::circulation::civil_today,
    repository::Repository,
};

/// Number of calendar months covered by the borrow trends report.
const TREND_MONTHS: u32 = 12;

#[derive(Clone)]
pub struct ReportsService {
    repository: Repository,
}

impl ReportsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Collect the dashboard counters
    pub async fn dashboard(&self) -> AppResult<DashboardSummary> {
        let pool = &self.repository.pool;

        let total_books: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(pool)
            .await?;

        let available_copies: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(copies), 0) FROM books")
                .fetch_one(pool)
                .await?;

        let active_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM booking_cart WHERE status = 'borrowed'")
                .fetch_one(pool)
                .await?;

        let overdue_loans: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM booking_cart WHERE status = 'overdue'")
                .fetch_one(pool)
                .await?;

        let registered_users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        let waiting_requests: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM booking_requests WHERE status = 'waiting'")
                .fetch_one(pool)
                .await?;

        Ok(DashboardSummary {
            total_books,
            total_copies: available_copies + active_loans + overdue_loans,
            available_copies,
            registered_users,
            active_loans,
            overdue_loans,
            waiting_requests,
        })
    }

    /// Count issuances per calendar month over the trailing twelve months.
    ///
    /// Stored borrow dates are already civil dates, so no timezone shifting
    /// happens here. Months without issuances are filled with zero.
    pub async fn monthly_trends(&self) -> AppResult<Vec<MonthlyTrend>> {
        let today = civil_today();
        let start = trend_window_start(today);

        let rows = sqlx::query(
            r#"
            SELECT TO_CHAR(DATE_TRUNC('month', borrow_date), 'YYYY-MM') AS period,
                   COUNT(*) AS count
            FROM booking_cart
            WHERE borrow_date IS NOT NULL AND borrow_date >= $1
            GROUP BY DATE_TRUNC('month', borrow_date)
            ORDER BY period
            "#,
        )
        .bind(start)
        .fetch_all(&self.repository.pool)
        .await?;

        let counted: Vec<(String, i64)> = rows
            .into_iter()
            .map(|row| (row.get("period"), row.get("count")))
            .collect();

        Ok(fill_months(start, &counted))
    }
}

/// First day of the month, eleven months before the given date.
fn trend_window_start(today: NaiveDate) -> NaiveDate {
    let mut year = today.year();
    let mut month = today.month() as i32 - (TREND_MONTHS as i32 - 1);
    if month <= 0 {
        month += 12;
        year -= 1;
    }
    // The first of a month always exists.
    NaiveDate::from_ymd_opt(year, month as u32, 1).unwrap_or(today)
}

/// Expand sparse (period, count) pairs into one entry per month of the window.
fn fill_months(start: NaiveDate, counted: &[(String, i64)]) -> Vec<MonthlyTrend> {
    let mut year = start.year();
    let mut month = start.month();

    (0..TREND_MONTHS)
        .map(|_| {
            let label = format!("{:04}-{:02}", year, month);
            let issued = counted
                .iter()
                .find(|(period, _)| *period == label)
                .map(|(_, count)| *count)
                .unwrap_or(0);

            month += 1;
            if month > 12 {
                month = 1;
                year += 1;
            }

            MonthlyTrend { month: label, issued }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_window_starts_eleven_months_back() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            trend_window_start(today),
            NaiveDate::from_ymd_opt(2023, 4, 1).unwrap()
        );

        let december = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(
            trend_window_start(december),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[test]
    fn fill_months_covers_the_whole_window_with_zeroes() {
        let start = NaiveDate::from_ymd_opt(2023, 4, 1).unwrap();
        let counted = vec![("2023-06".to_string(), 4), ("2024-02".to_string(), 1)];

        let trends = fill_months(start, &counted);

        assert_eq!(trends.len(), 12);
        assert_eq!(trends[0].month, "2023-04");
        assert_eq!(trends[0].issued, 0);
        assert_eq!(trends[2].month, "2023-06");
        assert_eq!(trends[2].issued, 4);
        assert_eq!(trends[10].month, "2024-02");
        assert_eq!(trends[10].issued, 1);
        assert_eq!(trends[11].month, "2024-03");
    }

    #[test]
    fn fill_months_rolls_over_year_boundaries() {
        let start = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();
        let trends = fill_months(start, &[]);

        assert_eq!(trends[0].month, "2023-11");
        assert_eq!(trends[2].month, "2024-01");
        assert_eq!(trends[11].month, "2024-10");
    }
}

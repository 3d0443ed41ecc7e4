// src/analytics/summary.rs
// =============================================================================
// Admin summary: totals, "today" counts, top domains/pages and a daily series.
//
// `summarize` is a pure function of the rows it's handed and `now`; the same
// data and the same `now` always give the same summary. `build_summary` does
// the store reads and then calls it.
//
// Days are UTC calendar days.
// =============================================================================

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::config::AnalyticsConfig;
use crate::store::{CheckStore, KeyedEvent, PageViewStore, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub total_checks: u64,
    pub today_checks: u64,
    pub total_page_views: u64,
    pub today_page_views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathCount {
    pub path: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub checks: u64,
    pub page_views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub totals: Totals,
    pub top_domains: Vec<DomainCount>,
    pub top_pages: Vec<PathCount>,
    /// Oldest day first, exactly `window_days` entries
    pub daily: Vec<DailyBucket>,
}

/// Midnight UTC of the day `now` falls on
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::default()))
}

// `days` days before `at`; saturates at the earliest representable time
fn days_before(at: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    TimeDelta::try_days(i64::from(days))
        .and_then(|delta| at.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Read what the summary needs from the store and summarize it
pub fn build_summary<S>(store: &S, now: DateTime<Utc>, policy: &AnalyticsConfig) -> Result<Summary>
where
    S: CheckStore + PageViewStore + ?Sized,
{
    let today = start_of_day(now);
    let totals = Totals {
        total_checks: store.count_checks(None)?,
        today_checks: store.count_checks(Some(today))?,
        total_page_views: store.count_page_views(None)?,
        today_page_views: store.count_page_views(Some(today))?,
    };

    // The daily series may reach further back than the top lists
    let lookback_days = policy.lookback_days.max(policy.window_days);
    let since = days_before(today, lookback_days);
    let checks = store.check_domains_since(since, policy.row_cap)?;
    let views = store.page_paths_since(since, policy.row_cap)?;

    Ok(summarize(totals, &checks, &views, now, policy))
}

pub fn summarize(
    totals: Totals,
    checks: &[KeyedEvent],
    views: &[KeyedEvent],
    now: DateTime<Utc>,
    policy: &AnalyticsConfig,
) -> Summary {
    let top_since = days_before(start_of_day(now), policy.lookback_days);

    let top_domains = top_counts(checks, top_since, policy.top_n)
        .into_iter()
        .map(|(domain, count)| DomainCount { domain, count })
        .collect();
    let top_pages = top_counts(views, top_since, policy.top_n)
        .into_iter()
        .map(|(path, count)| PathCount { path, count })
        .collect();

    Summary {
        generated_at: now,
        totals,
        top_domains,
        top_pages,
        daily: daily_series(checks, views, now.date_naive(), policy.window_days),
    }
}

// Counts per key, highest first; ties broken alphabetically
fn top_counts(events: &[KeyedEvent], since: DateTime<Utc>, top_n: usize) -> Vec<(String, u64)> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for event in events.iter().filter(|e| e.at >= since) {
        *counts.entry(event.key.as_str()).or_insert(0) += 1;
    }

    let mut ranked: Vec<(String, u64)> = counts
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_n);
    ranked
}

// `window_days` consecutive days ending on `today`, every day present
fn daily_series(
    checks: &[KeyedEvent],
    views: &[KeyedEvent],
    today: NaiveDate,
    window_days: u32,
) -> Vec<DailyBucket> {
    let mut buckets: BTreeMap<NaiveDate, (u64, u64)> = (0..window_days)
        .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
        .map(|date| (date, (0, 0)))
        .collect();

    for event in checks {
        if let Some(bucket) = buckets.get_mut(&event.at.date_naive()) {
            bucket.0 += 1;
        }
    }
    for event in views {
        if let Some(bucket) = buckets.get_mut(&event.at.date_naive()) {
            bucket.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(date, (checks, page_views))| DailyBucket {
            date,
            checks,
            page_views,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::SiteStatus;
    use crate::store::{NewCheck, NewPageView, SqliteStore};
    use chrono::Duration;

    fn at(key: &str, when: DateTime<Utc>) -> KeyedEvent {
        KeyedEvent {
            key: key.to_string(),
            at: when,
        }
    }

    fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_start_of_day_is_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 17, 45, 12).unwrap();
        assert_eq!(start_of_day(now), Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_daily_series_is_zero_filled_and_oldest_first() {
        let now = noon(2026, 3, 9);
        let checks = vec![at("a.com", now), at("a.com", now - Duration::days(2))];
        let views = vec![at("/", now - Duration::days(6)), at("/", now - Duration::days(7))];

        let summary = summarize(Totals::default(), &checks, &views, now, &AnalyticsConfig::default());

        assert_eq!(summary.daily.len(), 7);
        assert_eq!(summary.daily[0].date, NaiveDate::from_ymd_opt(2026, 3, 3).unwrap());
        assert_eq!(summary.daily[6].date, NaiveDate::from_ymd_opt(2026, 3, 9).unwrap());

        let checks_per_day: Vec<u64> = summary.daily.iter().map(|d| d.checks).collect();
        assert_eq!(checks_per_day, vec![0, 0, 0, 0, 1, 0, 1]);
        let views_per_day: Vec<u64> = summary.daily.iter().map(|d| d.page_views).collect();
        // The view 7 days ago falls outside the window
        assert_eq!(views_per_day, vec![1, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_window_length_follows_policy() {
        let policy = AnalyticsConfig {
            window_days: 3,
            ..AnalyticsConfig::default()
        };
        let summary = summarize(Totals::default(), &[], &[], noon(2026, 1, 1), &policy);

        assert_eq!(summary.daily.len(), 3);
        assert_eq!(summary.daily[0].date, NaiveDate::from_ymd_opt(2025, 12, 30).unwrap());
        assert!(summary.daily.iter().all(|d| d.checks == 0 && d.page_views == 0));
    }

    #[test]
    fn test_top_lists_rank_by_count_then_name() {
        let now = noon(2026, 3, 9);
        let checks = vec![
            at("b.com", now),
            at("a.com", now),
            at("c.com", now),
            at("c.com", now),
            at("c.com", now - Duration::days(45)),
        ];
        let policy = AnalyticsConfig {
            top_n: 2,
            ..AnalyticsConfig::default()
        };

        let summary = summarize(Totals::default(), &checks, &[], now, &policy);

        assert_eq!(
            summary.top_domains,
            vec![
                DomainCount { domain: "c.com".to_string(), count: 2 },
                DomainCount { domain: "a.com".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_huge_lookback_counts_everything() {
        let now = noon(2026, 3, 9);
        let checks = vec![at("old.com", now - Duration::days(4000)), at("new.com", now)];
        let policy = AnalyticsConfig {
            lookback_days: u32::MAX,
            ..AnalyticsConfig::default()
        };

        let summary = summarize(Totals::default(), &checks, &[], now, &policy);

        assert_eq!(summary.top_domains.len(), 2);
        assert_eq!(summary.daily.len(), 7);
    }

    #[test]
    fn test_build_summary_with_huge_lookback() {
        let store = SqliteStore::open_in_memory().unwrap();
        let policy = AnalyticsConfig {
            lookback_days: u32::MAX,
            ..AnalyticsConfig::default()
        };

        let summary = build_summary(&store, Utc::now(), &policy).unwrap();

        assert_eq!(summary.totals, Totals::default());
        assert!(summary.top_domains.is_empty());
    }

    #[test]
    fn test_same_input_same_summary() {
        let now = noon(2026, 3, 9);
        let checks = vec![at("x.com", now), at("y.com", now), at("x.com", now - Duration::days(1))];
        let views = vec![at("/recent", now), at("/", now)];
        let policy = AnalyticsConfig::default();

        let first = summarize(Totals::default(), &checks, &views, now, &policy);
        let second = summarize(Totals::default(), &checks, &views, now, &policy);
        assert_eq!(first, second);
    }

    #[test]
    fn test_build_summary_reads_store() {
        let store = SqliteStore::open_in_memory().unwrap();
        let now = Utc::now();
        let check = |domain: &str| NewCheck {
            url: format!("https://{}", domain),
            domain: domain.to_string(),
            status: SiteStatus::Up,
            status_code: Some(200),
            response_time_ms: 5,
            error_message: None,
        };
        store.insert_check_at(&check("example.com"), now).unwrap();
        store.insert_check_at(&check("example.com"), now).unwrap();
        store.insert_check_at(&check("rust-lang.org"), now - Duration::days(2)).unwrap();
        store
            .insert_page_view_at(
                &NewPageView { page_path: "/".to_string(), referrer: None, user_agent: None },
                now,
            )
            .unwrap();

        let summary = build_summary(&store, now, &AnalyticsConfig::default()).unwrap();

        assert_eq!(summary.totals.total_checks, 3);
        assert_eq!(summary.totals.today_checks, 2);
        assert_eq!(summary.totals.total_page_views, 1);
        assert_eq!(summary.totals.today_page_views, 1);
        assert_eq!(summary.top_domains[0].domain, "example.com");
        assert_eq!(summary.top_domains[0].count, 2);
        assert_eq!(summary.top_pages[0].path, "/");
        assert_eq!(summary.daily.last().unwrap().checks, 2);
    }
}

use crate::types::{
    CountMatrix, CountRow, DailyCountRow, Dimension, MeanDurationRow, MonthlyCountRow,
    OverviewStats, ShareMatrix, Ticket,
};
use crate::util::{duration_hours, mean, month_key};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// How many groups the truncated views keep.
pub const TOP_SUBCATEGORIES: usize = 10;
pub const TOP_COMPANIES: usize = 10;
pub const TOP_SLOWEST_CATEGORIES: usize = 5;

/// Count tickets per distinct value of `dim`, descending by count (ties
/// broken alphabetically so output is stable). Percentages are of the whole
/// filtered table, so null-valued rows pull the sum under 100.
pub fn count_by(data: &[Ticket], dim: Dimension) -> Vec<CountRow> {
    let total = data.len();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for t in data {
        if let Some(v) = dim.value(t) {
            *counts.entry(v).or_default() += 1;
        }
    }
    let mut rows: Vec<CountRow> = counts
        .into_iter()
        .map(|(value, count)| CountRow {
            value: value.to_string(),
            count,
            percentage: count as f64 / total as f64 * 100.0,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    rows
}

/// Top-N variant of [`count_by`] for the crowded dimensions.
pub fn top_count_by(data: &[Ticket], dim: Dimension, n: usize) -> Vec<CountRow> {
    let mut rows = count_by(data, dim);
    rows.truncate(n);
    rows
}

/// Mean time-to-close (hours) per distinct value of `dim`, descending by
/// mean. Tickets with a null duration are excluded from numerator and
/// denominator alike; open tickets never carry a duration, so they drop out
/// by construction. Groups with no closed tickets do not appear.
pub fn mean_duration_by(data: &[Ticket], dim: Dimension) -> Vec<MeanDurationRow> {
    let mut hours: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for t in data {
        if let (Some(v), Some(d)) = (dim.value(t), t.time_to_close) {
            hours.entry(v).or_default().push(duration_hours(d));
        }
    }
    let mut rows: Vec<MeanDurationRow> = hours
        .into_iter()
        .filter_map(|(value, samples)| {
            mean(&samples).map(|m| MeanDurationRow {
                value: value.to_string(),
                tickets: samples.len(),
                mean_hours: m,
            })
        })
        .collect();
    rows.sort_by(|a, b| {
        b.mean_hours
            .partial_cmp(&a.mean_hours)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.value.cmp(&b.value))
    });
    rows
}

/// The N slowest-to-resolve groups of a dimension.
pub fn slowest_by(data: &[Ticket], dim: Dimension, n: usize) -> Vec<MeanDurationRow> {
    let mut rows = mean_duration_by(data, dim);
    rows.truncate(n);
    rows
}

/// Tickets created per day, ascending chronologically. Rows without a
/// creation date are skipped.
pub fn daily_counts(data: &[Ticket]) -> Vec<DailyCountRow> {
    let mut counts: BTreeMap<chrono::NaiveDate, usize> = BTreeMap::new();
    for t in data {
        if let Some(created) = t.created {
            *counts.entry(created.date()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(date, count)| DailyCountRow { date, count })
        .collect()
}

/// Tickets created per `"YYYY-MM"` bucket with percentage of the filtered
/// total, ascending chronologically (never count-ordered).
pub fn monthly_counts(data: &[Ticket]) -> Vec<MonthlyCountRow> {
    let total = data.len();
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for t in data {
        if let Some(created) = t.created {
            *counts.entry(month_key(created)).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(month, count)| MonthlyCountRow {
            month,
            count,
            percentage: count as f64 / total as f64 * 100.0,
        })
        .collect()
}

/// Generic zero-filled cross tabulation. Buckets and columns each cover
/// exactly the values present in the filtered data; absent combinations are
/// 0, never missing.
fn cross_tab<F>(data: &[Ticket], bucket_label: &str, bucket_of: F, col: Dimension) -> CountMatrix
where
    F: Fn(&Ticket) -> Option<String>,
{
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    let mut buckets: std::collections::BTreeSet<String> = Default::default();
    let mut columns: std::collections::BTreeSet<String> = Default::default();
    for t in data {
        if let (Some(b), Some(c)) = (bucket_of(t), col.value(t)) {
            buckets.insert(b.clone());
            columns.insert(c.to_string());
            *counts.entry((b, c.to_string())).or_default() += 1;
        }
    }
    let buckets: Vec<String> = buckets.into_iter().collect();
    let columns: Vec<String> = columns.into_iter().collect();
    let cells = buckets
        .iter()
        .map(|b| {
            columns
                .iter()
                .map(|c| counts.get(&(b.clone(), c.clone())).copied().unwrap_or(0))
                .collect()
        })
        .collect();
    CountMatrix {
        bucket_label: bucket_label.to_string(),
        buckets,
        columns,
        cells,
    }
}

/// Month × dimension counts, for the stacked monthly series.
pub fn counts_by_month_and(data: &[Ticket], dim: Dimension) -> CountMatrix {
    cross_tab(data, "Month", |t| t.created.map(month_key), dim)
}

/// Day × dimension counts, for the stacked area series.
pub fn counts_by_day_and(data: &[Ticket], dim: Dimension) -> CountMatrix {
    cross_tab(data, "Date", |t| t.created.map(|c| c.date().to_string()), dim)
}

/// Category × subcategory counts, the heatmap table.
pub fn category_subcategory_matrix(data: &[Ticket]) -> CountMatrix {
    cross_tab(data, "Category", |t| t.category.clone(), Dimension::Subcategory)
}

/// Row-normalize the month × dimension matrix so each month's shares sum
/// to 1, showing compositional change independent of volume. All-zero
/// buckets cannot occur: a bucket only exists because some row counted into
/// it.
pub fn share_by_month_and(data: &[Ticket], dim: Dimension) -> ShareMatrix {
    let m = counts_by_month_and(data, dim);
    let cells = m
        .cells
        .iter()
        .map(|row| {
            let total: usize = row.iter().sum();
            row.iter()
                .map(|&c| if total == 0 { 0.0 } else { c as f64 / total as f64 })
                .collect()
        })
        .collect();
    ShareMatrix {
        bucket_label: m.bucket_label,
        buckets: m.buckets,
        columns: m.columns,
        cells,
    }
}

/// Headline numbers for the overview block. An empty table reports zero
/// tickets and a null mean rather than failing.
pub fn overview(data: &[Ticket]) -> OverviewStats {
    let durations: Vec<f64> = data
        .iter()
        .filter_map(|t| t.time_to_close)
        .map(duration_hours)
        .collect();
    OverviewStats {
        total_tickets: data.len(),
        open_tickets: data.iter().filter(|t| t.is_open()).count(),
        mean_resolution_hours: mean(&durations),
        high_priority_tickets: data
            .iter()
            .filter(|t| t.priority.as_deref() == Some("High"))
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDateTime};

    fn ticket(
        created: &str,
        category: Option<&str>,
        priority: &str,
        closed: bool,
        hours: Option<i64>,
    ) -> Ticket {
        let created = NaiveDateTime::parse_from_str(created, "%Y-%m-%d %H:%M:%S").unwrap();
        Ticket {
            id: String::new(),
            name: String::new(),
            description: String::new(),
            created: Some(created),
            priority: Some(priority.to_string()),
            owner: None,
            source: None,
            category: category.map(|s| s.to_string()),
            subcategory: Some("General".to_string()),
            company: None,
            closed: closed.then(|| created + Duration::hours(hours.unwrap_or(1))),
            time_to_close: hours.map(Duration::hours),
            resolution: String::new(),
        }
    }

    fn sample() -> Vec<Ticket> {
        vec![
            ticket("2024-01-10 09:00:00", Some("Hardware"), "High", true, Some(4)),
            ticket("2024-01-15 10:00:00", Some("Hardware"), "Low", true, Some(8)),
            ticket("2024-01-20 11:00:00", Some("Network"), "High", false, None),
            ticket("2024-02-01 12:00:00", Some("Network"), "Medium", true, Some(2)),
            ticket("2024-02-03 13:00:00", None, "Low", true, Some(6)),
        ]
    }

    #[test]
    fn counts_order_descending_and_sum_under_100_with_nulls() {
        let rows = count_by(&sample(), Dimension::Category);
        assert_eq!(rows[0].value, "Hardware");
        assert_eq!(rows[0].count, 2);
        let pct_sum: f64 = rows.iter().map(|r| r.percentage).sum();
        // One of five rows has a null category.
        assert!((pct_sum - 80.0).abs() < 1e-9);
    }

    #[test]
    fn percentages_sum_to_100_without_nulls() {
        let rows = count_by(&sample(), Dimension::Priority);
        let pct_sum: f64 = rows.iter().map(|r| r.percentage).sum();
        assert!((pct_sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn top_n_truncates_by_count() {
        let rows = top_count_by(&sample(), Dimension::Category, 1);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value, "Hardware");
    }

    #[test]
    fn mean_duration_skips_open_tickets() {
        let rows = mean_duration_by(&sample(), Dimension::Category);
        // Hardware: (4 + 8) / 2. Network has one open and one closed ticket;
        // only the closed one counts.
        let hardware = rows.iter().find(|r| r.value == "Hardware").unwrap();
        assert_eq!(hardware.tickets, 2);
        assert!((hardware.mean_hours - 6.0).abs() < 1e-9);
        let network = rows.iter().find(|r| r.value == "Network").unwrap();
        assert_eq!(network.tickets, 1);
        assert!((network.mean_hours - 2.0).abs() < 1e-9);
        // Descending by mean.
        assert_eq!(rows[0].value, "Hardware");
    }

    #[test]
    fn daily_and_monthly_counts_are_chronological() {
        let days = daily_counts(&sample());
        assert_eq!(days.len(), 5);
        assert!(days.windows(2).all(|w| w[0].date < w[1].date));

        let months = monthly_counts(&sample());
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].month, "2024-01");
        assert_eq!(months[0].count, 3);
        assert_eq!(months[1].month, "2024-02");
        assert_eq!(months[1].count, 2);
    }

    #[test]
    fn cross_tab_fills_missing_combinations_with_zero() {
        let m = counts_by_month_and(&sample(), Dimension::Category);
        assert_eq!(m.buckets, vec!["2024-01", "2024-02"]);
        assert_eq!(m.columns, vec!["Hardware", "Network"]);
        assert_eq!(m.get("2024-01", "Hardware"), Some(2));
        // No Hardware ticket in February: present as an explicit zero.
        assert_eq!(m.get("2024-02", "Hardware"), Some(0));
        assert_eq!(m.get("2024-02", "Network"), Some(1));
    }

    #[test]
    fn shares_sum_to_one_per_bucket() {
        let m = share_by_month_and(&sample(), Dimension::Category);
        for row in &m.cells {
            let sum: f64 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn heatmap_is_category_by_subcategory() {
        let m = category_subcategory_matrix(&sample());
        assert_eq!(m.bucket_label, "Category");
        assert_eq!(m.columns, vec!["General"]);
        assert_eq!(m.get("Hardware", "General"), Some(2));
    }

    #[test]
    fn empty_input_yields_empty_results() {
        let empty: Vec<Ticket> = Vec::new();
        assert!(count_by(&empty, Dimension::Category).is_empty());
        assert!(mean_duration_by(&empty, Dimension::Category).is_empty());
        assert!(daily_counts(&empty).is_empty());
        assert!(monthly_counts(&empty).is_empty());
        assert!(counts_by_month_and(&empty, Dimension::Category).is_empty());

        let stats = overview(&empty);
        assert_eq!(stats.total_tickets, 0);
        assert_eq!(stats.open_tickets, 0);
        assert!(stats.mean_resolution_hours.is_none());
    }

    #[test]
    fn overview_counts_open_and_high_priority() {
        let stats = overview(&sample());
        assert_eq!(stats.total_tickets, 5);
        assert_eq!(stats.open_tickets, 1);
        assert_eq!(stats.high_priority_tickets, 2);
        assert!((stats.mean_resolution_hours.unwrap() - 5.0).abs() < 1e-9);
    }
}

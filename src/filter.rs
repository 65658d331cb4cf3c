use crate::types::{Dimension, Ticket};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeSet;

/// Date-filter mode chosen in the sidebar. Modes other than `None` require a
/// parseable creation date; rows without one never pass them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilter {
    /// No date constraint; the effective window is the table's full span.
    None,
    /// User-supplied window, inclusive on both ends.
    Range { start: NaiveDate, end: NaiveDate },
    /// First through last day of one calendar month, inclusive.
    Month { year: i32, month: u32 },
    /// January 1 through December 31 of one year, inclusive.
    Year(i32),
}

/// Last day of a calendar month, leap years included.
fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.and_then(|d| d.pred_opt())
}

impl DateFilter {
    /// Resolve the mode to an inclusive window. For `None` that is the
    /// min..max creation date of the table (rows with unparseable dates are
    /// ignored); `None` is returned only when no row has a usable date or
    /// the month/year inputs are out of range.
    pub fn window(&self, data: &[Ticket]) -> Option<(NaiveDate, NaiveDate)> {
        match *self {
            DateFilter::None => {
                let mut dates = data.iter().filter_map(|t| t.created).map(|dt| dt.date());
                let first = dates.next()?;
                let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
                Some((min, max))
            }
            DateFilter::Range { start, end } => Some((start, end)),
            DateFilter::Month { year, month } => {
                let start = NaiveDate::from_ymd_opt(year, month, 1)?;
                Some((start, month_end(year, month)?))
            }
            DateFilter::Year(year) => Some((
                NaiveDate::from_ymd_opt(year, 1, 1)?,
                NaiveDate::from_ymd_opt(year, 12, 31)?,
            )),
        }
    }

    fn passes(&self, t: &Ticket, window: Option<(NaiveDate, NaiveDate)>) -> bool {
        if matches!(self, DateFilter::None) {
            return true;
        }
        let Some(created) = t.created else {
            return false;
        };
        // Only the date portion participates; 23:59 on the last day is in.
        match window {
            Some((start, end)) => {
                let d = created.date();
                d >= start && d <= end
            }
            None => false,
        }
    }
}

/// Everything the user selected in the sidebar, as one immutable value the
/// presentation layer hands in on each recomputation. Empty selection sets
/// are inert.
#[derive(Debug, Clone)]
pub struct FilterSelection {
    pub date: DateFilter,
    pub categories: Vec<String>,
    pub subcategories: Vec<String>,
    pub owners: Vec<String>,
    pub companies: Vec<String>,
}

impl Default for FilterSelection {
    fn default() -> Self {
        FilterSelection {
            date: DateFilter::None,
            categories: Vec::new(),
            subcategories: Vec::new(),
            owners: Vec::new(),
            companies: Vec::new(),
        }
    }
}

/// A non-empty set matches only rows whose value is present and selected;
/// null never matches.
fn passes_set(selected: &[String], value: Option<&str>) -> bool {
    if selected.is_empty() {
        return true;
    }
    match value {
        Some(v) => selected.iter().any(|s| s == v),
        None => false,
    }
}

impl FilterSelection {
    /// The conjunction of the date predicate and every active categorical
    /// predicate.
    pub fn matches(&self, t: &Ticket, window: Option<(NaiveDate, NaiveDate)>) -> bool {
        self.date.passes(t, window)
            && passes_set(&self.categories, t.category.as_deref())
            && passes_set(&self.subcategories, t.subcategory.as_deref())
            && passes_set(&self.owners, t.owner.as_deref())
            && passes_set(&self.companies, t.company.as_deref())
    }

    /// Recompute the filtered view. The source table is never mutated; every
    /// interaction builds a fresh view.
    pub fn apply(&self, data: &[Ticket]) -> Vec<Ticket> {
        let window = self.date.window(data);
        data.iter()
            .filter(|t| self.matches(t, window))
            .cloned()
            .collect()
    }
}

/// Sorted distinct non-null values of one dimension; this is what the
/// multi-select pickers offer as options.
pub fn distinct_values(data: &[Ticket], dim: Dimension) -> Vec<String> {
    let set: BTreeSet<&str> = data.iter().filter_map(|t| dim.value(t)).collect();
    set.into_iter().map(|s| s.to_string()).collect()
}

/// Years present in the table's creation dates, for the year/month pickers.
pub fn available_years(data: &[Ticket]) -> Vec<i32> {
    let set: BTreeSet<i32> = data
        .iter()
        .filter_map(|t| t.created)
        .map(|dt| dt.year())
        .collect();
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn ticket(id: &str, created: Option<&str>, category: Option<&str>, owner: Option<&str>) -> Ticket {
        Ticket {
            id: id.to_string(),
            name: String::new(),
            description: String::new(),
            created: created.map(|s| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
            }),
            priority: Some("Medium".to_string()),
            owner: owner.map(|s| s.to_string()),
            source: Some("Email".to_string()),
            category: category.map(|s| s.to_string()),
            subcategory: None,
            company: None,
            closed: None,
            time_to_close: None,
            resolution: String::new(),
        }
    }

    fn sample() -> Vec<Ticket> {
        vec![
            ticket("1", Some("2024-03-01 09:00:00"), Some("Hardware"), Some("Ana")),
            ticket("2", Some("2024-03-31 23:59:00"), Some("Network"), None),
            ticket("3", Some("2024-04-01 00:00:00"), Some("Hardware"), Some("Bruno")),
            ticket("4", None, Some("Software"), Some("Ana")),
        ]
    }

    #[test]
    fn inert_filters_keep_every_row() {
        let data = sample();
        let filtered = FilterSelection::default().apply(&data);
        assert_eq!(filtered.len(), data.len());
    }

    #[test]
    fn filtered_view_never_grows() {
        let data = sample();
        let sel = FilterSelection {
            categories: vec!["Hardware".to_string()],
            ..Default::default()
        };
        assert!(sel.apply(&data).len() <= data.len());
    }

    #[test]
    fn month_window_is_inclusive_on_both_ends() {
        let sel = FilterSelection {
            date: DateFilter::Month { year: 2024, month: 3 },
            ..Default::default()
        };
        let data = sample();
        let window = sel.date.window(&data).unwrap();
        assert_eq!(window.0, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(window.1, NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());

        let filtered = sel.apply(&data);
        let ids: Vec<&str> = filtered.iter().map(|t| t.id.as_str()).collect();
        // 2024-03-31 23:59 passes, 2024-04-01 00:00 does not.
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn null_creation_date_fails_active_date_filters() {
        let data = sample();
        let sel = FilterSelection {
            date: DateFilter::Year(2024),
            ..Default::default()
        };
        assert!(sel.apply(&data).iter().all(|t| t.created.is_some()));
        // Mode `None` keeps the dateless row.
        assert_eq!(FilterSelection::default().apply(&data).len(), 4);
    }

    #[test]
    fn categorical_selection_excludes_nulls() {
        let data = sample();
        let sel = FilterSelection {
            owners: vec!["Ana".to_string(), "Bruno".to_string()],
            ..Default::default()
        };
        let filtered = sel.apply(&data);
        assert_eq!(filtered.len(), 3);
        assert!(filtered
            .iter()
            .all(|t| matches!(t.owner.as_deref(), Some("Ana") | Some("Bruno"))));
    }

    #[test]
    fn filters_combine_with_and() {
        let data = sample();
        let sel = FilterSelection {
            date: DateFilter::Month { year: 2024, month: 3 },
            categories: vec!["Hardware".to_string()],
            ..Default::default()
        };
        let filtered = sel.apply(&data);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, "1");
    }

    #[test]
    fn leap_february_window() {
        let window = DateFilter::Month { year: 2024, month: 2 }.window(&[]).unwrap();
        assert_eq!(window.1, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    }

    #[test]
    fn distinct_values_are_sorted_and_non_null() {
        let data = sample();
        assert_eq!(
            distinct_values(&data, Dimension::Category),
            vec!["Hardware", "Network", "Software"]
        );
        assert_eq!(distinct_values(&data, Dimension::Owner), vec!["Ana", "Bruno"]);
        assert_eq!(available_years(&data), vec![2024]);
    }
}

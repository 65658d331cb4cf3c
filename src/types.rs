use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One row of the uploaded export, exactly as the parser hands it to us.
///
/// Every field is optional: messy exports routinely drop cells, and the
/// loader decides per field whether a missing value is tolerable.
#[derive(Debug, Default, Deserialize)]
pub struct RawRow {
    #[serde(rename = "Ticket ID")]
    pub ticket_id: Option<String>,
    #[serde(rename = "Ticket Name")]
    pub ticket_name: Option<String>,
    #[serde(rename = "Ticket Description")]
    pub ticket_description: Option<String>,
    #[serde(rename = "Creation Date")]
    pub creation_date: Option<String>,
    #[serde(rename = "Priority")]
    pub priority: Option<String>,
    #[serde(rename = "Ticket Owner")]
    pub ticket_owner: Option<String>,
    #[serde(rename = "Source")]
    pub source: Option<String>,
    #[serde(rename = "Category")]
    pub category: Option<String>,
    #[serde(rename = "Sub-category")]
    pub subcategory: Option<String>,
    #[serde(rename = "Associated Company")]
    pub associated_company: Option<String>,
    #[serde(rename = "Closing Date")]
    pub closing_date: Option<String>,
    #[serde(rename = "Time to Close (HH:mm:ss)")]
    pub time_to_close: Option<String>,
    #[serde(rename = "Resolution")]
    pub resolution: Option<String>,
}

/// A normalized ticket. Timestamps and the time-to-close duration are typed;
/// a `None` means the source cell was absent or failed to parse.
///
/// `time_to_close` is never negative: the loader nulls out anything that
/// would be.
#[derive(Debug, Clone)]
pub struct Ticket {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created: Option<NaiveDateTime>,
    pub priority: Option<String>,
    pub owner: Option<String>,
    pub source: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub company: Option<String>,
    pub closed: Option<NaiveDateTime>,
    pub time_to_close: Option<Duration>,
    pub resolution: String,
}

impl Ticket {
    /// A ticket is open while it has no closing timestamp.
    pub fn is_open(&self) -> bool {
        self.closed.is_none()
    }
}

/// The categorical grouping axes reports can be keyed on. Using an enum keeps
/// column access typed instead of threading column-name strings through the
/// aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Priority,
    Owner,
    Source,
    Category,
    Subcategory,
    Company,
}

impl Dimension {
    pub fn value<'a>(&self, t: &'a Ticket) -> Option<&'a str> {
        match self {
            Dimension::Priority => t.priority.as_deref(),
            Dimension::Owner => t.owner.as_deref(),
            Dimension::Source => t.source.as_deref(),
            Dimension::Category => t.category.as_deref(),
            Dimension::Subcategory => t.subcategory.as_deref(),
            Dimension::Company => t.company.as_deref(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Priority => "Priority",
            Dimension::Owner => "Ticket Owner",
            Dimension::Source => "Source",
            Dimension::Category => "Category",
            Dimension::Subcategory => "Sub-category",
            Dimension::Company => "Associated Company",
        }
    }
}

fn fmt_2dp(v: &f64) -> String {
    format!("{:.2}", v)
}

/// Count of tickets per distinct dimension value, with the value's share of
/// the filtered total (the total includes rows whose value is null, so the
/// percentages can sum to less than 100).
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct CountRow {
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "Tickets")]
    #[tabled(rename = "Tickets")]
    pub count: usize,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage", display_with = "fmt_2dp")]
    pub percentage: f64,
}

/// Mean time-to-close per dimension value, in hours, over tickets with a
/// non-null duration only.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MeanDurationRow {
    #[serde(rename = "Value")]
    #[tabled(rename = "Value")]
    pub value: String,
    #[serde(rename = "ClosedTickets")]
    #[tabled(rename = "ClosedTickets")]
    pub tickets: usize,
    #[serde(rename = "MeanHours")]
    #[tabled(rename = "MeanHours", display_with = "fmt_2dp")]
    pub mean_hours: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DailyCountRow {
    #[serde(rename = "Date")]
    #[tabled(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Tickets")]
    #[tabled(rename = "Tickets")]
    pub count: usize,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthlyCountRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Tickets")]
    #[tabled(rename = "Tickets")]
    pub count: usize,
    #[serde(rename = "Percentage")]
    #[tabled(rename = "Percentage", display_with = "fmt_2dp")]
    pub percentage: f64,
}

/// A zero-filled cross tabulation: one row per bucket (month, day, or
/// category), one column per dimension value seen in the filtered data.
#[derive(Debug, Clone)]
pub struct CountMatrix {
    pub bucket_label: String,
    pub buckets: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<usize>>,
}

impl CountMatrix {
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Cell lookup by labels, mainly for tests and spot checks.
    pub fn get(&self, bucket: &str, column: &str) -> Option<usize> {
        let r = self.buckets.iter().position(|b| b == bucket)?;
        let c = self.columns.iter().position(|col| col == column)?;
        Some(self.cells[r][c])
    }
}

/// Row-normalized variant of [`CountMatrix`]: each bucket's cells sum to 1.
#[derive(Debug, Clone)]
pub struct ShareMatrix {
    pub bucket_label: String,
    pub buckets: Vec<String>,
    pub columns: Vec<String>,
    pub cells: Vec<Vec<f64>>,
}

/// Headline metrics for the overview report.
#[derive(Debug, Serialize)]
pub struct OverviewStats {
    pub total_tickets: usize,
    pub open_tickets: usize,
    pub mean_resolution_hours: Option<f64>,
    pub high_priority_tickets: usize,
}

use crate::loader::REQUIRED_COLUMNS;
use crate::types::{CountMatrix, ShareMatrix, Ticket};
use crate::util::{format_datetime, format_hms};
use serde::Serialize;
use std::error::Error;
use std::io::Write;
use tabled::{builder::Builder, settings::Style, Table, Tabled};

/// Write the filtered rows as UTF-8 CSV with the canonical column set, in
/// a layout the loader can read back.
pub fn write_filtered_csv<W: Write>(writer: W, rows: &[Ticket]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(REQUIRED_COLUMNS)?;
    for t in rows {
        let created = t.created.map(format_datetime).unwrap_or_default();
        let closed = t.closed.map(format_datetime).unwrap_or_default();
        let time_to_close = t.time_to_close.map(format_hms).unwrap_or_default();
        wtr.write_record([
            t.id.as_str(),
            t.name.as_str(),
            t.description.as_str(),
            created.as_str(),
            t.priority.as_deref().unwrap_or(""),
            t.owner.as_deref().unwrap_or(""),
            t.source.as_deref().unwrap_or(""),
            t.category.as_deref().unwrap_or(""),
            t.subcategory.as_deref().unwrap_or(""),
            t.company.as_deref().unwrap_or(""),
            closed.as_str(),
            time_to_close.as_str(),
            t.resolution.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_filtered_csv_file(path: &str, rows: &[Ticket]) -> Result<(), Box<dyn Error>> {
    let file = std::fs::File::create(path)?;
    write_filtered_csv(file, rows)
}

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

fn render_grid<I, R>(bucket_label: &str, columns: &[String], rows: I) -> String
where
    I: Iterator<Item = (String, R)>,
    R: Iterator<Item = String>,
{
    let mut builder = Builder::default();
    let mut header = vec![bucket_label.to_string()];
    header.extend(columns.iter().cloned());
    builder.push_record(header);
    for (bucket, cells) in rows {
        let mut record = vec![bucket];
        record.extend(cells);
        builder.push_record(record);
    }
    builder.build().with(Style::markdown()).to_string()
}

/// Print a cross tabulation as a markdown grid, one row per bucket.
pub fn preview_matrix(m: &CountMatrix) {
    if m.buckets.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let rows = m.buckets.iter().zip(&m.cells).map(|(b, cells)| {
        (b.clone(), cells.iter().map(|c| c.to_string()))
    });
    println!("{}\n", render_grid(&m.bucket_label, &m.columns, rows));
}

/// Same grid for the row-normalized shares, rendered to two decimals.
pub fn preview_share_matrix(m: &ShareMatrix) {
    if m.buckets.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let rows = m.buckets.iter().zip(&m.cells).map(|(b, cells)| {
        (b.clone(), cells.iter().map(|c| format!("{:.2}", c)))
    });
    println!("{}\n", render_grid(&m.bucket_label, &m.columns, rows));
}

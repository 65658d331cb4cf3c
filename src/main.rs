// Entry point and high-level CLI flow.
//
// The menu mirrors the tabs of the original dashboard:
// - Option [1] loads a ticket export (.csv or .xlsx) and caches it.
// - Option [2] edits the filter selection (date window + categorical sets).
// - Options [3]-[6] run the overview, category, temporal, and performance
//   reports against the filtered view.
// - Option [7] exports the filtered rows as CSV.
// Every report re-applies the current filters to the cached table, so a
// filter change is picked up by the next action.
mod error;
mod filter;
mod loader;
mod output;
mod reports;
mod types;
mod util;

use chrono::NaiveDate;
use filter::{DateFilter, FilterSelection};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use types::{Dimension, Ticket};

// Simple in-memory session state: the table is loaded once, the filter
// selection is replaced wholesale on every edit.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        data: None,
        filters: FilterSelection::default(),
    })
});

struct AppState {
    data: Option<Vec<Ticket>>,
    filters: FilterSelection,
}

/// Read a single line of input after printing a prompt.
fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

fn prompt_date(label: &str) -> Option<NaiveDate> {
    let s = prompt(label);
    match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            println!("Invalid date (expected YYYY-MM-DD).");
            None
        }
    }
}

/// Numbered multi-select over the distinct values of one dimension. An
/// empty answer selects nothing, which leaves that filter inert.
fn prompt_multi_select(data: &[Ticket], dim: Dimension) -> Vec<String> {
    let options = filter::distinct_values(data, dim);
    if options.is_empty() {
        return Vec::new();
    }
    println!("{} options:", dim.label());
    for (i, opt) in options.iter().enumerate() {
        println!("  [{}] {}", i + 1, opt);
    }
    let answer = prompt("Select numbers (comma-separated, empty for all): ");
    let mut selected = Vec::new();
    for part in answer.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.parse::<usize>() {
            Ok(n) if (1..=options.len()).contains(&n) => {
                let v = options[n - 1].clone();
                if !selected.contains(&v) {
                    selected.push(v);
                }
            }
            _ => println!("Ignoring invalid option '{}'.", part),
        }
    }
    selected
}

/// Handle option [1]: read the file and run it through the loader.
fn handle_load() {
    let path = prompt("Path to ticket export (.csv or .xlsx): ");
    if path.is_empty() {
        println!("No file given.\n");
        return;
    }
    let bytes = match std::fs::read(&path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Failed to read file: {}\n", e);
            return;
        }
    };
    match loader::load(&bytes, &path) {
        Ok((data, report)) => {
            println!(
                "Processing dataset... ({} tickets loaded, {} cells coerced to null)\n",
                util::format_int(report.total_rows as i64),
                util::format_int(report.coerced_cells as i64)
            );
            let mut state = APP_STATE.lock().unwrap();
            state.data = Some(data);
            state.filters = FilterSelection::default();
        }
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
        }
    }
}

/// Handle option [2]: rebuild the filter selection from scratch.
fn handle_set_filters() {
    let data = {
        let state = APP_STATE.lock().unwrap();
        state.data.clone()
    };
    let Some(data) = data else {
        println!("Error: No data loaded. Please load a ticket export first (option 1).\n");
        return;
    };

    println!("Date filter:");
    println!("[1] No filter");
    println!("[2] Date range");
    println!("[3] Specific month");
    println!("[4] Specific year");
    let date = match read_choice().as_str() {
        "2" => {
            let start = prompt_date("Start date (YYYY-MM-DD): ");
            let end = prompt_date("End date (YYYY-MM-DD): ");
            match (start, end) {
                (Some(start), Some(end)) => DateFilter::Range { start, end },
                _ => DateFilter::None,
            }
        }
        "3" => {
            let years = filter::available_years(&data);
            if let Some((first, last)) = years.first().zip(years.last()) {
                println!("Years in data: {}..{}", first, last);
            }
            let month: Option<u32> = prompt("Month (1-12): ").parse().ok();
            let year: Option<i32> = prompt("Year: ").parse().ok();
            match (year, month) {
                (Some(year), Some(month)) if (1..=12).contains(&month) => {
                    DateFilter::Month { year, month }
                }
                _ => {
                    println!("Invalid month/year; using no date filter.");
                    DateFilter::None
                }
            }
        }
        "4" => match prompt("Year: ").parse::<i32>() {
            Ok(year) => DateFilter::Year(year),
            Err(_) => {
                println!("Invalid year; using no date filter.");
                DateFilter::None
            }
        },
        _ => DateFilter::None,
    };

    let selection = FilterSelection {
        date,
        categories: prompt_multi_select(&data, Dimension::Category),
        subcategories: prompt_multi_select(&data, Dimension::Subcategory),
        owners: prompt_multi_select(&data, Dimension::Owner),
        companies: prompt_multi_select(&data, Dimension::Company),
    };
    let matched = selection.apply(&data).len();
    println!(
        "Filters set. {} of {} tickets match.\n",
        util::format_int(matched as i64),
        util::format_int(data.len() as i64)
    );
    let mut state = APP_STATE.lock().unwrap();
    state.filters = selection;
}

/// The filtered view the report handlers work on, or `None` with a message
/// when nothing is loaded yet.
fn filtered_view() -> Option<Vec<Ticket>> {
    let state = APP_STATE.lock().unwrap();
    match &state.data {
        Some(data) => Some(state.filters.apply(data)),
        None => {
            println!("Error: No data loaded. Please load a ticket export first (option 1).\n");
            None
        }
    }
}

fn handle_overview() {
    let Some(view) = filtered_view() else { return };
    let stats = reports::overview(&view);
    println!("Overview\n");
    println!("Total tickets:          {}", util::format_int(stats.total_tickets as i64));
    println!("Open tickets:           {}", util::format_int(stats.open_tickets as i64));
    match stats.mean_resolution_hours {
        Some(h) => println!("Mean resolution time:   {} hours", util::format_number(h, 2)),
        None => println!("Mean resolution time:   n/a"),
    }
    println!(
        "High priority tickets:  {}\n",
        util::format_int(stats.high_priority_tickets as i64)
    );
    if let Err(e) = output::write_json("summary.json", &stats) {
        eprintln!("Write error: {}", e);
    }
    println!("Priority distribution:");
    output::preview_table_rows(&reports::count_by(&view, Dimension::Priority), 10);
    println!("Source distribution:");
    output::preview_table_rows(&reports::count_by(&view, Dimension::Source), 10);
    println!("Tickets created per day:");
    output::preview_table_rows(&reports::daily_counts(&view), 15);
}

fn handle_category_report() {
    let Some(view) = filtered_view() else { return };
    println!("Tickets per category:");
    output::preview_table_rows(&reports::count_by(&view, Dimension::Category), 20);
    println!("Top {} subcategories:", reports::TOP_SUBCATEGORIES);
    output::preview_table_rows(
        &reports::top_count_by(&view, Dimension::Subcategory, reports::TOP_SUBCATEGORIES),
        reports::TOP_SUBCATEGORIES,
    );
    println!("Top {} companies:", reports::TOP_COMPANIES);
    output::preview_table_rows(
        &reports::top_count_by(&view, Dimension::Company, reports::TOP_COMPANIES),
        reports::TOP_COMPANIES,
    );
    println!("Category x sub-category heatmap:");
    output::preview_matrix(&reports::category_subcategory_matrix(&view));
    println!("Tickets per category and day:");
    output::preview_matrix(&reports::counts_by_day_and(&view, Dimension::Category));
}

fn handle_temporal_report() {
    let Some(view) = filtered_view() else { return };
    println!("Tickets created per month:");
    output::preview_table_rows(&reports::monthly_counts(&view), 24);
    println!("Tickets created per day:");
    output::preview_table_rows(&reports::daily_counts(&view), 31);
    println!("Tickets per month and category:");
    output::preview_matrix(&reports::counts_by_month_and(&view, Dimension::Category));
    println!("Category share per month:");
    output::preview_share_matrix(&reports::share_by_month_and(&view, Dimension::Category));
}

fn handle_performance_report() {
    let Some(view) = filtered_view() else { return };
    println!("Mean resolution time per category (hours):");
    output::preview_table_rows(&reports::mean_duration_by(&view, Dimension::Category), 20);
    println!(
        "Top {} slowest categories:",
        reports::TOP_SLOWEST_CATEGORIES
    );
    output::preview_table_rows(
        &reports::slowest_by(&view, Dimension::Category, reports::TOP_SLOWEST_CATEGORIES),
        reports::TOP_SLOWEST_CATEGORIES,
    );
    println!("Mean resolution time per priority (hours):");
    output::preview_table_rows(&reports::mean_duration_by(&view, Dimension::Priority), 10);
}

fn handle_export() {
    let Some(view) = filtered_view() else { return };
    let mut path = prompt("Output file [tickets_filtered.csv]: ");
    if path.is_empty() {
        path = "tickets_filtered.csv".to_string();
    }
    match output::write_filtered_csv_file(&path, &view) {
        Ok(()) => println!(
            "Exported {} tickets to {}\n",
            util::format_int(view.len() as i64),
            path
        ),
        Err(e) => eprintln!("Write error: {}\n", e),
    }
}

fn main() {
    env_logger::init();
    loop {
        println!("Ticket Report");
        println!("[1] Load ticket export");
        println!("[2] Set filters");
        println!("[3] Overview");
        println!("[4] Category analysis");
        println!("[5] Temporal analysis");
        println!("[6] Performance analysis");
        println!("[7] Export filtered data");
        println!("[0] Exit\n");
        match read_choice().as_str() {
            "1" => handle_load(),
            "2" => handle_set_filters(),
            "3" => handle_overview(),
            "4" => handle_category_report(),
            "5" => handle_temporal_report(),
            "6" => handle_performance_report(),
            "7" => handle_export(),
            "0" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 0-7.\n"),
        }
    }
}

use chrono::{Datelike, Local};
use std::path::PathBuf;

/// Generate default output filename with format: covid-target-list-{YYMMDD}.tsv
pub fn generate_default_output_filename() -> PathBuf {
    let now = Local::now();
    let year = now.year() % 100; // Get last 2 digits of year
    let month = now.month();
    let day = now.day();

    let filename = format!("covid-target-list-{:02}{:02}{:02}.tsv", year, month, day);
    PathBuf::from("output").join(filename)
}

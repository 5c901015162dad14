//! Which weekly export to use and where it lives.
//!
//! Exports are published per week ending on a Saturday and are named
//! `turnstile_YYMMDD.txt` after that Saturday.

use chrono::{Datelike, Days, NaiveDate};

pub const DEFAULT_BASE_URL: &str = "http://web.mta.info/developers/data/nyct/turnstile/";

/// Returns `today` if it is a Saturday, otherwise the Saturday before it.
pub fn last_saturday(today: NaiveDate) -> NaiveDate {
    let back = match today.weekday().num_days_from_sunday() {
        6 => 0,
        n => u64::from(n) + 1,
    };
    today - Days::new(back)
}

/// File name of the export for the week ending on `saturday`.
pub fn export_filename(saturday: NaiveDate) -> String {
    format!("turnstile_{}.txt", saturday.format("%y%m%d"))
}

/// Remote location of `filename` under `base_url`.
pub fn export_url(base_url: &str, filename: &str) -> String {
    if base_url.ends_with('/') {
        format!("{base_url}{filename}")
    } else {
        format!("{base_url}/{filename}")
    }
}

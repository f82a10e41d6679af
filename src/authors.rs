// src/authors.rs

//! Unique identities from the commit table, with a location guessed from the
//! UTC offset. The guess is a display approximation: many places share an
//! offset.

use crate::error::{LedgerError, LedgerResult};
use crate::model::{AuthorIdentity, AuthorRecord, Location};
use crate::table::{write_records, Table};
use anyhow::Context;
use std::path::Path;
use tracing::{debug, info};

const SECONDS_PER_HOUR: f64 = 3600.0;

const UNKNOWN: Location = Location {
    city: "Unknown",
    state: Some("Unknown"),
    country: "Unknown",
};

const fn place(city: &'static str, state: Option<&'static str>, country: &'static str) -> Location {
    Location {
        city,
        state,
        country,
    }
}

/// Offset in hours → location. Matched exactly.
const LOCATIONS: [(f64, Location); 19] = [
    (10.0, place("Melbourne", None, "Australia")),
    (8.0, place("Beijing", None, "China")),
    (7.0, place("Bangkok", None, "Thailand")),
    (6.0, place("Dhakar", None, "Senegal")),
    (5.0, place("New Delhi", None, "India")),
    (4.0, place("Abu Dhabi", None, "United Arab Emirates")),
    (3.0, place("Moscow", None, "Russia")),
    (0.0, place("London", None, "United Kingdom")),
    (-1.0, place("Praia", None, "Cape Verde")),
    (-2.0, place("Nuuk", None, "Greenland")),
    (-3.0, place("São Paulo", None, "Brazil")),
    (-4.0, place("St. John's", None, "Canada")),
    (-5.0, place("New York", Some("NY"), "United States")),
    (-5.3, place("Indianapolis", Some("IN"), "United States")),
    (-6.0, place("Chicago", Some("IL"), "United States")),
    (-7.0, place("Phoenix", Some("AZ"), "United States")),
    (-8.0, place("Redmond", Some("WA"), "United States")),
    (-9.0, place("Anchorage", Some("AK"), "United States")),
    (-13.0, place("Sydney", None, "Australia")),
];

/// Column pairs projecting the commit table onto `(name, email, timezone)`
const AUTHOR_VIEW: [(&str, &str); 3] = [
    ("author_name", "name"),
    ("author_email", "email"),
    ("author_tz", "timezone"),
];
const COMMITTER_VIEW: [(&str, &str); 3] = [
    ("committer_name", "name"),
    ("committer_email", "email"),
    ("committer_tz", "timezone"),
];

/// Guesses a place for a UTC offset in hours. Total: unmapped values give `Unknown`.
pub fn guess_location(timezone_hours: f64) -> Location {
    match LOCATIONS.iter().find(|(hours, _)| *hours == timezone_hours) {
        Some((_, location)) => *location,
        None => {
            debug!(timezone_hours, "Unknown time zone");
            UNKNOWN
        }
    }
}

pub fn offset_hours(timezone_seconds: i64) -> f64 {
    timezone_seconds as f64 / SECONDS_PER_HOUR
}

/// Author and committer identities of a commit table, first occurrence order, no duplicates.
pub fn unique_identities(commits: &Table) -> LedgerResult<Vec<AuthorIdentity>> {
    let authors = commits.select(&AUTHOR_VIEW)?;
    let committers = commits.select(&COMMITTER_VIEW)?;
    let mut unified = authors.concat(committers)?;
    unified.drop_duplicates();

    unified
        .rows()
        .iter()
        .map(|row| {
            Ok(AuthorIdentity {
                name: row[0].clone(),
                email: row[1].clone(),
                timezone: parse_offset(&row[2])?,
            })
        })
        .collect()
}

/// Offsets are whole seconds; tolerate a float rendering like `-18000.0`.
fn parse_offset(cell: &str) -> LedgerResult<i64> {
    let cell = cell.trim();
    let invalid = || LedgerError::InvalidValue {
        column: "timezone".to_string(),
        value: cell.to_string(),
    };
    match cell.parse::<i64>() {
        Ok(seconds) => Ok(seconds),
        Err(_) => {
            let seconds = cell.parse::<f64>().map_err(|_| invalid())?;
            if seconds.is_finite() && seconds.fract() == 0.0 {
                Ok(seconds as i64)
            } else {
                Err(invalid())
            }
        }
    }
}

pub fn resolve_authors(commits: &Table) -> LedgerResult<Vec<AuthorRecord>> {
    let records = unique_identities(commits)?
        .into_iter()
        .map(|identity| {
            let hours = offset_hours(identity.timezone);
            AuthorRecord::new(identity, hours, guess_location(hours))
        })
        .collect();
    Ok(records)
}

/// Builds `Authors.csv` from `Commits.csv`.
pub fn identify_authors(
    commits_file_path: &Path,
    output_file_path: &Path,
) -> anyhow::Result<Vec<AuthorRecord>> {
    info!("Reading commit data from {}", commits_file_path.display());
    let commits = Table::read_csv(commits_file_path)
        .with_context(|| format!("Failed to read {}", commits_file_path.display()))?;

    let authors = resolve_authors(&commits)?;

    write_records(output_file_path, &AuthorRecord::COLUMNS, &authors)
        .with_context(|| format!("Failed to write {}", output_file_path.display()))?;
    info!(
        "Saved {} authors to {}",
        authors.len(),
        output_file_path.display()
    );
    Ok(authors)
}

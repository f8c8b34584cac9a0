//! Unit enumeration
//!
//! Expands a requested date scope crossed with a site selector into the
//! ordered, de-duplicated set of units a query covers.

use std::collections::BTreeSet;

use crate::errors::{CoreError, Result};
use crate::model::{SiteSelector, Unit};
use crate::time::date_to_mjd;

/// One end of a date scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayRef {
    /// Absolute MJD
    Mjd(i32),
    /// Days relative to today (non-positive)
    Offset(i32),
}

impl DayRef {
    /// Negative MJDs are offsets from today
    pub fn from_mjd(mjd: i32) -> Self {
        if mjd < 0 {
            DayRef::Offset(mjd)
        } else {
            DayRef::Mjd(mjd)
        }
    }

    pub fn from_date(date: &str) -> Result<Self> {
        Ok(DayRef::Mjd(date_to_mjd(date)?))
    }

    pub fn resolve(&self, today: i32) -> i32 {
        match self {
            DayRef::Mjd(mjd) => *mjd,
            DayRef::Offset(days) => today + days,
        }
    }
}

/// Raw scope options as given on the command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeOptions {
    pub mjd: Option<i32>,
    pub mjd_start: Option<i32>,
    pub mjd_end: Option<i32>,
    pub date: Option<String>,
    pub date_start: Option<String>,
    pub date_end: Option<String>,
}

/// A validated date scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateScope {
    /// Nothing given: the current observing night
    Today,
    Single(DayRef),
    /// Open ends default to the earliest night and to today
    Range {
        start: Option<DayRef>,
        end: Option<DayRef>,
    },
}

impl DateScope {
    /// Accept at most one of: an MJD, an MJD range, a date, a date range
    pub fn from_options(options: &ScopeOptions) -> Result<Self> {
        let mut given = Vec::new();
        if options.mjd.is_some() {
            given.push("mjd");
        }
        if options.mjd_start.is_some() || options.mjd_end.is_some() {
            given.push("mjd range");
        }
        if options.date.is_some() {
            given.push("date");
        }
        if options.date_start.is_some() || options.date_end.is_some() {
            given.push("date range");
        }
        if given.len() > 1 {
            return Err(CoreError::AmbiguousScope {
                given: given.into_iter().map(str::to_string).collect(),
            });
        }

        if let Some(mjd) = options.mjd {
            return Ok(DateScope::Single(DayRef::from_mjd(mjd)));
        }
        if let Some(date) = &options.date {
            return Ok(DateScope::Single(DayRef::from_date(date)?));
        }
        if options.mjd_start.is_some() || options.mjd_end.is_some() {
            return Ok(DateScope::Range {
                start: options.mjd_start.map(DayRef::from_mjd),
                end: options.mjd_end.map(DayRef::from_mjd),
            });
        }
        if options.date_start.is_some() || options.date_end.is_some() {
            return Ok(DateScope::Range {
                start: options.date_start.as_deref().map(DayRef::from_date).transpose()?,
                end: options.date_end.as_deref().map(DayRef::from_date).transpose()?,
            });
        }
        Ok(DateScope::Today)
    }

    /// Inclusive MJD bounds
    pub fn resolve(&self, today: i32, earliest: i32) -> Result<(i32, i32)> {
        let (start, end) = match self {
            DateScope::Today => (today, today),
            DateScope::Single(day) => {
                let mjd = day.resolve(today);
                (mjd, mjd)
            }
            DateScope::Range { start, end } => (
                start.map_or(earliest, |d| d.resolve(today)),
                end.map_or(today, |d| d.resolve(today)),
            ),
        };
        if start > end {
            return Err(CoreError::EmptyScope { start, end });
        }
        Ok((start, end))
    }
}

/// Site-major, date-minor units for a scope
pub fn enumerate_units(
    sites: SiteSelector,
    scope: &DateScope,
    today: i32,
    earliest: i32,
) -> Result<Vec<Unit>> {
    let (start, end) = scope.resolve(today, earliest)?;
    let units: BTreeSet<Unit> = sites
        .sites()
        .into_iter()
        .flat_map(|site| (start..=end).map(move |mjd| Unit::new(site, mjd)))
        .collect();
    Ok(units.into_iter().collect())
}

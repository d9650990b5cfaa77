//! Tabular per-rank timing report.

use std::cmp::Ordering;
use std::io::Write;

use super::{FormatError, Formatter};
use crate::parallel::Comm;

/// Accumulated timings of one named region.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionTiming {
    pub name: String,
    pub calls: u64,
    /// Time spent in the region itself, excluding children.
    pub self_secs: f64,
    /// Time spent in the region including children.
    pub total_secs: f64,
}

impl RegionTiming {
    pub fn new(name: impl Into<String>, calls: u64, self_secs: f64, total_secs: f64) -> Self {
        Self { name: name.into(), calls, self_secs, total_secs }
    }
}

/// Measurement data collected on one rank.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileData {
    pub regions: Vec<RegionTiming>,
}

impl ProfileData {
    pub fn push(&mut self, region: RegionTiming) {
        self.regions.push(region);
    }
}

/// Formats `ProfileData` as a fixed-column table headed by the rank.
#[derive(Debug, Clone)]
pub struct TableFormatter {
    /// Width of the routine name column.
    pub name_width: usize,
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self { name_width: 40 }
    }
}

impl TableFormatter {
    pub fn new(name_width: usize) -> Self {
        Self { name_width }
    }

    fn validate(&self, region: &RegionTiming) -> Result<(), FormatError> {
        if region.name.chars().count() > self.name_width {
            return Err(FormatError::ColumnOverflow {
                name: region.name.clone(),
                width: self.name_width,
            });
        }
        for t in [region.self_secs, region.total_secs] {
            if !t.is_finite() || t < 0.0 {
                return Err(FormatError::InvalidValue {
                    name: region.name.clone(),
                    reason: "time must be finite and non-negative",
                });
            }
        }
        Ok(())
    }
}

impl<C: Comm + ?Sized> Formatter<C> for TableFormatter {
    type Data = ProfileData;

    fn format(&self, out: &mut Vec<u8>, data: &ProfileData, comm: &C) -> Result<(), FormatError> {
        for region in &data.regions {
            self.validate(region)?;
        }

        // Most expensive first; ties keep name order so output is stable.
        let mut rows: Vec<&RegionTiming> = data.regions.iter().collect();
        rows.sort_by(|a, b| {
            b.self_secs
                .partial_cmp(&a.self_secs)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        let self_total: f64 = rows.iter().map(|r| r.self_secs).sum();

        let w = self.name_width;
        writeln!(out, "Profiling on rank {} of {}.", comm.rank(), comm.size())?;
        writeln!(
            out,
            "{:>5} {:<w$} {:>10} {:>8} {:>12} {:>12}",
            "#", "Routine", "Calls", "%Time", "Self (s)", "Total (s)"
        )?;
        for (i, r) in rows.iter().enumerate() {
            let pct = if self_total > 0.0 { 100.0 * r.self_secs / self_total } else { 0.0 };
            writeln!(
                out,
                "{:>5} {:<w$} {:>10} {:>8.2} {:>12.6} {:>12.6}",
                i + 1,
                r.name,
                r.calls,
                pct,
                r.self_secs,
                r.total_secs
            )?;
        }
        writeln!(out)?;
        Ok(())
    }
}

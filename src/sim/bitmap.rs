//! Per-second boolean time vectors.
//!
//! A [`Bitmap`] holds one flag per simulated second; `true` means free (or
//! allowed). One-day bitmaps come from `HH:MM-HH:MM` range specs, multi-day
//! bitmaps from a per-weekday table of such specs.

use std::collections::BTreeMap;
use std::ops::{BitAnd, Range, RangeInclusive};

use chrono::Weekday;

use super::types::{SECS_PER_DAY, weekday_after};
use crate::error::{ConfigError, TimeRangeError};

/// Fixed-length per-second flag vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    bits: Vec<bool>,
}

impl Bitmap {
    /// Creates a bitmap of `len` flags, all set to `value`.
    pub fn new(len: usize, value: bool) -> Self {
        Self {
            bits: vec![value; len],
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Flag at `index`; out-of-range indices read as `false`.
    pub fn get(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    /// Sets every flag in `range` (clipped to the bitmap length) to `value`.
    pub fn set_range(&mut self, range: Range<usize>, value: bool) {
        let end = range.end.min(self.bits.len());
        if range.start < end {
            self.bits[range.start..end].fill(value);
        }
    }

    /// Number of `true` flags.
    pub fn count_ones(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// `true` if `range` lies inside the bitmap and every flag in it is set.
    pub fn all_set(&self, range: Range<usize>) -> bool {
        range.end <= self.bits.len() && self.bits[range].iter().all(|&b| b)
    }

    /// Copies `range` (clipped to the bitmap length) into a new bitmap.
    pub fn slice(&self, range: Range<usize>) -> Bitmap {
        let end = range.end.min(self.bits.len());
        let start = range.start.min(end);
        Bitmap {
            bits: self.bits[start..end].to_vec(),
        }
    }

    /// Index of the first `true` flag.
    pub fn earliest(&self) -> Option<usize> {
        self.bits.iter().position(|&b| b)
    }

    /// Index of the last `true` flag, found as the earliest flag of the
    /// reversed vector.
    pub fn latest(&self) -> Option<usize> {
        self.bits
            .iter()
            .rev()
            .position(|&b| b)
            .map(|from_tail| self.bits.len() - 1 - from_tail)
    }

    /// Left-to-right scan for the first fully set window of `len` flags
    /// whose start lies in `starts`.
    pub fn first_run(&self, starts: RangeInclusive<usize>, len: usize) -> Option<usize> {
        let (lo, hi) = (*starts.start(), *starts.end());
        if lo > hi {
            return None;
        }
        if len == 0 {
            return Some(lo);
        }

        let stop = hi.checked_add(len)?.min(self.bits.len());
        let mut run = 0;
        for i in lo..stop {
            if self.bits[i] {
                run += 1;
                if run == len {
                    return Some(i + 1 - len);
                }
            } else {
                run = 0;
            }
        }
        None
    }

    /// Raw flags.
    pub fn as_slice(&self) -> &[bool] {
        &self.bits
    }
}

impl BitAnd for &Bitmap {
    type Output = Bitmap;

    /// Element-wise AND over the common length.
    fn bitand(self, rhs: &Bitmap) -> Bitmap {
        Bitmap {
            bits: self
                .bits
                .iter()
                .zip(&rhs.bits)
                .map(|(&a, &b)| a && b)
                .collect(),
        }
    }
}

/// Parses `HH:MM` into seconds since midnight; 24:00 and later clamp to the
/// end of the day.
fn parse_clock(raw: &str, whole: &str) -> Result<usize, TimeRangeError> {
    let malformed = || TimeRangeError(whole.to_string());
    let (hours, minutes) = raw.trim().split_once(':').ok_or_else(malformed)?;
    let hours: usize = hours.trim().parse().map_err(|_| malformed())?;
    let minutes: usize = minutes.trim().parse().map_err(|_| malformed())?;

    if hours >= 24 {
        return Ok(SECS_PER_DAY);
    }
    Ok((hours * 3_600 + minutes * 60).min(SECS_PER_DAY))
}

/// One-day bitmap that is `true` inside every `HH:MM-HH:MM` sub-range of a
/// comma-separated spec.
///
/// Empty sub-ranges are ignored, so `""` yields an all-false day.
///
/// # Errors
///
/// Returns a [`TimeRangeError`] for a sub-range that does not parse.
///
/// # Examples
///
/// ```
/// use nilm_tracegen::sim::bitmap::time_range_bitmap;
///
/// let day = time_range_bitmap("08:00-09:00, 23:30-25:00").unwrap();
/// assert_eq!(day.count_ones(), 3_600 + 1_800);
/// ```
pub fn time_range_bitmap(spec: &str) -> Result<Bitmap, TimeRangeError> {
    let mut day = Bitmap::new(SECS_PER_DAY, false);

    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (from, to) = part
            .split_once('-')
            .ok_or_else(|| TimeRangeError(part.to_string()))?;
        let from = parse_clock(from, part)?;
        let to = parse_clock(to, part)?;
        day.set_range(from..to, true);
    }

    Ok(day)
}

/// Range specs keyed by weekday; an absent weekday means "never".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WeekdayRanges {
    ranges: [Option<String>; 7],
}

impl WeekdayRanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`WeekdayRanges::set`].
    pub fn with(mut self, day: Weekday, spec: &str) -> Self {
        self.set(day, spec);
        self
    }

    /// Same spec for all seven days.
    pub fn every_day(spec: &str) -> Self {
        let mut ranges = Self::new();
        for day in super::types::WEEKDAYS {
            ranges.set(day, spec);
        }
        ranges
    }

    pub fn set(&mut self, day: Weekday, spec: &str) {
        self.ranges[day.num_days_from_monday() as usize] = Some(spec.to_string());
    }

    pub fn get(&self, day: Weekday) -> Option<&str> {
        self.ranges[day.num_days_from_monday() as usize].as_deref()
    }

    /// Builds the table from a map keyed by weekday name (`"monday"`, `"tue"`, …).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a key that is not a weekday.
    pub fn from_map(map: &BTreeMap<String, String>, field: &str) -> Result<Self, ConfigError> {
        let mut ranges = Self::new();
        for (key, spec) in map {
            let day: Weekday = key.parse().map_err(|_| {
                ConfigError::invalid(format!("{field}.{key}"), "not a weekday name")
            })?;
            ranges.set(day, spec);
        }
        Ok(ranges)
    }
}

/// Multi-day bitmap: day `d` copies the range bitmap of its weekday, or is
/// all-false if that weekday has no spec.
///
/// # Errors
///
/// Returns a [`TimeRangeError`] if any weekday spec does not parse.
pub fn weekly_bitmap(
    ranges: &WeekdayRanges,
    num_days: usize,
    start: Weekday,
) -> Result<Bitmap, TimeRangeError> {
    let mut per_weekday: [Option<Bitmap>; 7] = Default::default();
    for (slot, spec) in per_weekday.iter_mut().zip(&ranges.ranges) {
        if let Some(spec) = spec {
            *slot = Some(time_range_bitmap(spec)?);
        }
    }

    let mut bits = Vec::with_capacity(num_days * SECS_PER_DAY);
    for d in 0..num_days {
        let weekday = weekday_after(start, d);
        match &per_weekday[weekday.num_days_from_monday() as usize] {
            Some(day) => bits.extend_from_slice(day.as_slice()),
            None => bits.resize(bits.len() + SECS_PER_DAY, false),
        }
    }

    Ok(Bitmap { bits })
}

//! Daily keys and the seeded generator shared by every game.
//!
//! Seed format: `u32(YYYYMMDD) ^ fnv1a32(locale)`, fed into a Mulberry32
//! stream. The same calendar day and locale always yield the same stream.

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;
const MULBERRY_INCREMENT: u32 = 0x6d2b_79f5;
const U32_RANGE: f64 = 4_294_967_296.0;

/// Errors raised when a persisted or user-supplied day key is malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DailyKeyError {
    #[error("day key '{0}' is not in YYYY-MM-DD form")]
    Format(String),
    #[error("day key '{0}' is not a calendar date")]
    InvalidDate(String),
}

/// Calendar day identifier used to seed the generator and partition records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DailyKey(NaiveDate);

impl DailyKey {
    /// Build a key from an explicit date.
    #[must_use]
    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build a key from year, month and day, if they form a real date.
    #[must_use]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Key for the current local calendar day.
    #[must_use]
    pub fn today() -> Self {
        Self(Local::now().date_naive())
    }

    #[must_use]
    pub const fn date(self) -> NaiveDate {
        self.0
    }

    /// Numeric `YYYYMMDD` form, wrapped into 32 bits.
    #[must_use]
    pub fn numeric(self) -> u32 {
        let value = i64::from(self.0.year()) * 10_000
            + i64::from(self.0.month()) * 100
            + i64::from(self.0.day());
        u32::try_from(value.rem_euclid(1_i64 << 32)).unwrap_or(0)
    }
}

impl fmt::Display for DailyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{:02}-{:02}",
            self.0.year(),
            self.0.month(),
            self.0.day()
        )
    }
}

impl FromStr for DailyKey {
    type Err = DailyKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.splitn(3, '-');
        let (Some(y), Some(m), Some(d)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(DailyKeyError::Format(trimmed.to_string()));
        };
        let parse_err = || DailyKeyError::Format(trimmed.to_string());
        let year: i32 = y.parse().map_err(|_| parse_err())?;
        let month: u32 = m.parse().map_err(|_| parse_err())?;
        let day: u32 = d.parse().map_err(|_| parse_err())?;
        Self::from_ymd(year, month, day)
            .ok_or_else(|| DailyKeyError::InvalidDate(trimmed.to_string()))
    }
}

impl TryFrom<String> for DailyKey {
    type Error = DailyKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DailyKey> for String {
    fn from(value: DailyKey) -> Self {
        value.to_string()
    }
}

/// 32-bit FNV-1a over UTF-16 code units; the empty string hashes to 0.
#[must_use]
pub fn fnv1a32(text: &str) -> u32 {
    if text.is_empty() {
        return 0;
    }
    text.encode_utf16().fold(FNV32_OFFSET, |hash, unit| {
        (hash ^ u32::from(unit)).wrapping_mul(FNV32_PRIME)
    })
}

/// Combine a day and a locale into the generator seed.
#[must_use]
pub fn daily_seed(day: DailyKey, locale: &str) -> u32 {
    day.numeric() ^ fnv1a32(locale)
}

/// Mulberry32 stream, exclusively owned by one game session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyRng {
    state: u32,
    draws: u64,
}

impl DailyRng {
    #[must_use]
    pub const fn from_seed(seed: u32) -> Self {
        Self {
            state: seed,
            draws: 0,
        }
    }

    /// Generator for the given day and locale.
    #[must_use]
    pub fn for_day(day: DailyKey, locale: &str) -> Self {
        Self::from_seed(daily_seed(day, locale))
    }

    /// Next value in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        f64::from(self.next_raw()) / U32_RANGE
    }

    /// Number of draws consumed so far.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }

    fn next_raw(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.state = self.state.wrapping_add(MULBERRY_INCREMENT);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }
}

impl rand::RngCore for DailyRng {
    fn next_u32(&mut self) -> u32 {
        self.next_raw()
    }

    fn next_u64(&mut self) -> u64 {
        let hi = u64::from(self.next_raw());
        let lo = u64::from(self.next_raw());
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_raw().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// Generator for today in the local timezone.
#[must_use]
pub fn daily_rng(locale: &str) -> DailyRng {
    DailyRng::for_day(DailyKey::today(), locale)
}

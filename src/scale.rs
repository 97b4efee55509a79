//! Quantized color scale over the attainment percentage.
//!
//! The domain `[min, max]` is cut into [`BUCKET_COUNT`] equal-width buckets
//! by `BUCKET_COUNT - 1` interior thresholds. A value falls into the bucket
//! whose index equals the number of thresholds less than or equal to it, so
//! bucket `i` covers `[t(i-1), t(i))` and the last bucket is closed at `max`.
//! Values outside the domain clamp to the first or last bucket.
//!
//! When `min == max` every threshold equals `min` and all values land in the
//! last (darkest) bucket; every extent then collapses to `[min, min]`.

use crate::types::EducationRecord;

pub const BUCKET_COUNT: usize = 9;

/// Sequential blue palette, lightest to darkest.
pub const BLUES_9: [&str; BUCKET_COUNT] = [
    "#f7fbff", "#deebf7", "#c6dbef", "#9ecae1", "#6baed6", "#4292c6", "#2171b5", "#08519c",
    "#08306b",
];

#[derive(Debug, Clone)]
pub struct ColorScale {
    domain: (f64, f64),
    thresholds: Vec<f64>,
    colors: Vec<String>,
}

impl ColorScale {
    /// Builds a scale over `domain` with one bucket per color.
    pub fn new(domain: (f64, f64), colors: Vec<String>) -> Self {
        let (lo, hi) = domain;
        let n = colors.len();
        let thresholds = (1..n)
            .map(|i| lo + (hi - lo) * i as f64 / n as f64)
            .collect();
        Self {
            domain,
            thresholds,
            colors,
        }
    }

    /// Builds a scale spanning the observed attainment range. Returns `None`
    /// for an empty record set or an empty palette.
    pub fn from_records(records: &[EducationRecord], colors: Vec<String>) -> Option<Self> {
        if colors.is_empty() {
            return None;
        }
        let domain = records
            .iter()
            .map(|r| r.bachelors_or_higher)
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        Some(Self::new(domain, colors))
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn colors(&self) -> &[String] {
        &self.colors
    }

    pub fn bucket_count(&self) -> usize {
        self.colors.len()
    }

    pub fn bucket(&self, value: f64) -> usize {
        self.thresholds.partition_point(|t| *t <= value)
    }

    pub fn color(&self, value: f64) -> &str {
        &self.colors[self.bucket(value)]
    }

    /// Numeric bounds of bucket `index`.
    pub fn bucket_extent(&self, index: usize) -> (f64, f64) {
        let (lo, hi) = self.domain;
        let lower = if index == 0 {
            lo
        } else {
            self.thresholds[index - 1]
        };
        let upper = self.thresholds.get(index).copied().unwrap_or(hi);
        (lower, upper)
    }

    /// Recovers the bounds of the bucket painted with `color`.
    pub fn invert_extent(&self, color: &str) -> Option<(f64, f64)> {
        self.colors
            .iter()
            .position(|c| c.eq_ignore_ascii_case(color))
            .map(|index| self.bucket_extent(index))
    }
}

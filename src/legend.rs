use crate::render::escape_xml;
use crate::scale::ColorScale;
use serde::Serialize;

pub const LEGEND_WIDTH: f64 = 700.0;
pub const LEGEND_HEIGHT: f64 = 50.0;
const LEGEND_MARGIN_RIGHT: f64 = 100.0;
const LEGEND_OFFSET_BOTTOM: f64 = 70.0;
const LABEL_GAP: f64 = 20.0;
const LABEL_NUDGE_X: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub color: String,
    pub lower: f64,
    pub upper: f64,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Legend {
    pub entries: Vec<LegendEntry>,
}

impl Legend {
    /// One entry per bucket in ascending order, bounds taken from the
    /// scale's inverse.
    pub fn from_scale(scale: &ColorScale) -> Self {
        let entries = scale
            .colors()
            .iter()
            .enumerate()
            .map(|(i, color)| {
                let (lower, upper) = scale
                    .invert_extent(color)
                    .unwrap_or_else(|| scale.bucket_extent(i));
                LegendEntry {
                    color: color.clone(),
                    lower,
                    upper,
                    label: range_label(lower, upper),
                }
            })
            .collect();
        Self { entries }
    }

    pub fn swatch_width(&self) -> f64 {
        LEGEND_WIDTH / self.entries.len().max(1) as f64
    }

    /// Appends the legend group to an SVG document of the given size.
    pub fn draw(&self, svg: &mut String, canvas_width: f64, canvas_height: f64) {
        let w = self.swatch_width();
        svg.push_str(&format!(
            "  <g id=\"legend\" transform=\"translate({}, {})\">\n",
            canvas_width - LEGEND_WIDTH - LEGEND_MARGIN_RIGHT,
            canvas_height - LEGEND_OFFSET_BOTTOM
        ));
        for (i, entry) in self.entries.iter().enumerate() {
            svg.push_str(&format!(
                "    <rect class=\"legend-rect\" x=\"{}\" y=\"0\" width=\"{}\" height=\"{}\" fill=\"{}\"/>\n",
                i as f64 * w,
                w,
                LEGEND_HEIGHT,
                escape_xml(&entry.color)
            ));
        }
        for (i, entry) in self.entries.iter().enumerate() {
            svg.push_str(&format!(
                "    <text class=\"legend-label\" x=\"{}\" y=\"{}\" text-anchor=\"middle\" style=\"font-weight: bold; font-size: 15px\">{}</text>\n",
                i as f64 * w + w / 2.0 + LABEL_NUDGE_X,
                LEGEND_HEIGHT + LABEL_GAP,
                escape_xml(&entry.label)
            ));
        }
        svg.push_str("  </g>\n");
    }
}

pub fn range_label(lower: f64, upper: f64) -> String {
    format!("{}% - {}%", lower.round(), upper.round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::{BLUES_9, BUCKET_COUNT};

    fn scale(lo: f64, hi: f64) -> ColorScale {
        ColorScale::new((lo, hi), BLUES_9.iter().map(|c| c.to_string()).collect())
    }

    #[test]
    fn one_entry_per_bucket() {
        let legend = Legend::from_scale(&scale(10.0, 90.0));
        assert_eq!(legend.entries.len(), BUCKET_COUNT);
        assert_eq!(legend.entries[0].color, "#f7fbff");
        assert_eq!(legend.entries[8].color, "#08306b");
    }

    #[test]
    fn ranges_are_contiguous_and_cover_the_domain() {
        let legend = Legend::from_scale(&scale(2.6, 75.1));
        assert_eq!(legend.entries.first().unwrap().lower, 2.6);
        assert_eq!(legend.entries.last().unwrap().upper, 75.1);
        for pair in legend.entries.windows(2) {
            assert_eq!(pair[0].upper, pair[1].lower);
        }
        assert!(legend.entries[0].label.starts_with("3% - "));
        assert!(legend.entries[8].label.ends_with(" - 75%"));
    }

    #[test]
    fn labels_round_to_whole_percentages() {
        assert_eq!(range_label(2.6, 10.655), "3% - 11%");
        assert_eq!(range_label(10.0, 18.888), "10% - 19%");
    }

    #[test]
    fn draw_places_swatches_side_by_side() {
        let legend = Legend::from_scale(&scale(10.0, 90.0));
        let mut svg = String::new();
        legend.draw(&mut svg, 960.0, 900.0);

        assert!(svg.contains("<g id=\"legend\" transform=\"translate(160, 830)\">"));
        assert_eq!(svg.matches("class=\"legend-rect\"").count(), BUCKET_COUNT);
        assert_eq!(svg.matches("class=\"legend-label\"").count(), BUCKET_COUNT);
        let w = LEGEND_WIDTH / 9.0;
        assert!(svg.contains(&format!("x=\"{}\" y=\"0\" width=\"{}\"", 8.0 * w, w)));
    }
}

//! Hover interaction: typed pointer events driving the one shared tooltip.
//!
//! The hover API (`/api/hover`) answers with the state this model reaches.
//! The browser page runs the same rules in script; constants here are
//! written into that script so both stay in step.

use crate::types::{EducationRecord, Fips};
use serde::Serialize;

pub const FADE_IN_MS: u32 = 200;
pub const FADE_OUT_MS: u32 = 500;
pub const VISIBLE_OPACITY: f64 = 0.9;
pub const OFFSET_X: f64 = 5.0;
pub const OFFSET_Y: f64 = -28.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pointer {
    pub page_x: f64,
    pub page_y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HoverEvent {
    Enter {
        fips: Fips,
        record: Option<EducationRecord>,
        pointer: Pointer,
    },
    Leave,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipState {
    pub opacity: f64,
    pub transition_ms: u32,
    pub text: String,
    pub education: Option<f64>,
    pub left: f64,
    pub top: f64,
}

impl Default for TooltipState {
    fn default() -> Self {
        Self {
            opacity: 0.0,
            transition_ms: 0,
            text: String::new(),
            education: None,
            left: 0.0,
            top: 0.0,
        }
    }
}

/// The single tooltip shared by every county shape.
#[derive(Debug, Default)]
pub struct Tooltip {
    state: TooltipState,
}

impl Tooltip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TooltipState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.opacity > 0.0
    }

    pub fn handle(&mut self, event: &HoverEvent) {
        match event {
            HoverEvent::Enter {
                record: Some(record),
                pointer,
                ..
            } => {
                self.state = TooltipState {
                    opacity: VISIBLE_OPACITY,
                    transition_ms: FADE_IN_MS,
                    text: tooltip_text(record),
                    education: Some(record.bachelors_or_higher),
                    left: pointer.page_x + OFFSET_X,
                    top: pointer.page_y + OFFSET_Y,
                };
            }
            // Counties without education data keep the tooltip hidden
            HoverEvent::Enter { record: None, .. } => {}
            HoverEvent::Leave => {
                self.state.opacity = 0.0;
                self.state.transition_ms = FADE_OUT_MS;
            }
        }
    }
}

pub fn tooltip_text(record: &EducationRecord) -> String {
    format!("{}: {}%", record.area_name, record.bachelors_or_higher)
}

/// JSON shape returned by the hover API and embedded in the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TooltipPayload {
    pub fips: Fips,
    pub area_name: String,
    pub state: Option<String>,
    pub education: f64,
    pub color: String,
    pub tooltip: String,
}

impl TooltipPayload {
    pub fn new(record: &EducationRecord, color: &str) -> Self {
        Self {
            fips: record.fips,
            area_name: record.area_name.clone(),
            state: record.state.clone(),
            education: record.bachelors_or_higher,
            color: color.to_string(),
            tooltip: tooltip_text(record),
        }
    }
}

/// Browser-side handlers for the shared `#tooltip` element. Expects an
/// `educationById` object keyed by fips to be defined beforehand.
pub fn hover_script() -> String {
    format!(
        r##"const tooltip = document.getElementById("tooltip");
document.querySelectorAll("#map .county").forEach((shape) => {{
  shape.addEventListener("mouseover", (event) => {{
    const record = educationById[shape.getAttribute("data-fips")];
    if (!record) return;
    tooltip.style.transition = "opacity {fade_in}ms";
    tooltip.style.opacity = {opacity};
    tooltip.textContent = record.tooltip;
    tooltip.setAttribute("data-education", record.education);
    tooltip.style.left = (event.pageX + {dx}) + "px";
    tooltip.style.top = (event.pageY + {dy}) + "px";
  }});
  shape.addEventListener("mouseout", () => {{
    tooltip.style.transition = "opacity {fade_out}ms";
    tooltip.style.opacity = 0;
  }});
}});
"##,
        fade_in = FADE_IN_MS,
        fade_out = FADE_OUT_MS,
        opacity = VISIBLE_OPACITY,
        dx = OFFSET_X,
        dy = OFFSET_Y,
    )
}

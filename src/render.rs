use crate::config::{AppConfig, RenderConfig};
use crate::join::JoinIndex;
use crate::legend::Legend;
use crate::projection::{self, Projection};
use crate::scale::ColorScale;
use crate::tooltip::{self, HoverEvent, Pointer, TooltipPayload};
use crate::types::{County, EducationRecord, Fips};
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

// Space kept free under the map for the legend when fitting a projection
const LEGEND_BAND: f64 = 120.0;

/// One county as drawn: projected geometry in map-group coordinates plus
/// the attributes written onto its `<path>`.
#[derive(Debug, Clone)]
pub struct CountyShape {
    pub fips: Fips,
    pub fill: String,
    /// Attainment percentage, 0 when the county has no record
    pub education: f64,
    pub matched: bool,
    pub path: String,
    pub geometry: MultiPolygon<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub counties: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub domain: (f64, f64),
}

/// Everything a render pass produces, built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct ChoroplethMap {
    pub config: RenderConfig,
    pub index: JoinIndex,
    pub scale: ColorScale,
    pub legend: Legend,
    pub shapes: Vec<CountyShape>,
}

/// Read-only context handed to each drawing step.
struct RenderContext<'a> {
    index: &'a JoinIndex,
    scale: &'a ColorScale,
    projection: &'a dyn Projection,
    fallback_color: &'a str,
}

pub fn build_map(
    config: &RenderConfig,
    counties: Vec<County>,
    records: Vec<EducationRecord>,
) -> Result<ChoroplethMap> {
    config.validate()?;
    let scale = ColorScale::from_records(&records, config.palette.clone())
        .ok_or_else(|| anyhow!("Education dataset is empty; cannot derive a color scale"))?;
    tracing::info!(
        "Color scale domain {:?} over {} buckets",
        scale.domain(),
        scale.bucket_count()
    );

    let index = JoinIndex::build(records);
    tracing::info!("Join index holds {} education records", index.len());

    let projection = projection::build(
        config.projection,
        &counties,
        config.width,
        (config.height - config.map_offset_y - LEGEND_BAND).max(1.0),
    );

    let ctx = RenderContext {
        index: &index,
        scale: &scale,
        projection: projection.as_ref(),
        fallback_color: &config.fallback_color,
    };
    let shapes: Vec<CountyShape> = counties.par_iter().map(|c| shape_county(&ctx, c)).collect();

    let legend = Legend::from_scale(&scale);
    let map = ChoroplethMap {
        config: config.clone(),
        index,
        scale,
        legend,
        shapes,
    };

    let summary = map.summary();
    if summary.unmatched > 0 {
        tracing::warn!(
            "{} of {} counties have no education record; drawn with {}",
            summary.unmatched,
            summary.counties,
            config.fallback_color
        );
    }
    Ok(map)
}

fn shape_county(ctx: &RenderContext<'_>, county: &County) -> CountyShape {
    let geometry = projection::project_geometry(ctx.projection, &county.geometry);
    let path = projection::svg_path(&geometry);
    let (fill, education, matched) = match ctx.index.get(county.id) {
        Some(record) => (
            ctx.scale.color(record.bachelors_or_higher).to_string(),
            record.bachelors_or_higher,
            true,
        ),
        None => (ctx.fallback_color.to_string(), 0.0, false),
    };
    CountyShape {
        fips: county.id,
        fill,
        education,
        matched,
        path,
        geometry,
    }
}

impl ChoroplethMap {
    pub fn summary(&self) -> RenderSummary {
        let matched = self.shapes.iter().filter(|s| s.matched).count();
        RenderSummary {
            counties: self.shapes.len(),
            matched,
            unmatched: self.shapes.len() - matched,
            domain: self.scale.domain(),
        }
    }

    pub fn shape(&self, fips: Fips) -> Option<&CountyShape> {
        self.shapes.iter().find(|s| s.fips == fips)
    }

    /// Tooltip payload for a county, `None` when it has no education record.
    pub fn payload(&self, fips: Fips) -> Option<TooltipPayload> {
        self.index
            .get(fips)
            .map(|record| TooltipPayload::new(record, self.scale.color(record.bachelors_or_higher)))
    }

    /// Pointer-enter event for the county `fips`.
    pub fn hover(&self, fips: Fips, pointer: Pointer) -> HoverEvent {
        HoverEvent::Enter {
            fips,
            record: self.index.get(fips).cloned(),
            pointer,
        }
    }

    pub fn to_svg(&self) -> String {
        let c = &self.config;
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" id=\"map\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = c.width,
            h = c.height
        );
        self.draw_counties(&mut svg);
        self.draw_titles(&mut svg);
        self.legend.draw(&mut svg, c.width, c.height);
        svg.push_str("</svg>\n");
        svg
    }

    fn draw_counties(&self, svg: &mut String) {
        svg.push_str(&format!(
            "  <g transform=\"translate(0, {})\">\n",
            self.config.map_offset_y
        ));
        for shape in &self.shapes {
            svg.push_str(&format!(
                "    <path class=\"county\" data-fips=\"{}\" data-education=\"{}\" fill=\"{}\" d=\"{}\"/>\n",
                shape.fips,
                shape.education,
                escape_xml(&shape.fill),
                shape.path
            ));
        }
        svg.push_str("  </g>\n");
    }

    fn draw_titles(&self, svg: &mut String) {
        let x = self.config.width / 2.0;
        svg.push_str(&format!(
            "  <text id=\"title\" x=\"{}\" y=\"50\" text-anchor=\"middle\" style=\"font-size: 50px; font-weight: bold\">{}</text>\n",
            x,
            escape_xml(&self.config.title)
        ));
        svg.push_str(&format!(
            "  <text id=\"description\" x=\"{}\" y=\"90\" text-anchor=\"middle\" style=\"font-size: 25px\">{}</text>\n",
            x,
            escape_xml(&self.config.description)
        ));
    }

    /// Host page embedding the SVG, the shared tooltip and the hover script.
    pub fn to_html(&self) -> Result<String> {
        let records: BTreeMap<Fips, TooltipPayload> = self
            .index
            .iter()
            .map(|r| (r.fips, TooltipPayload::new(r, self.scale.color(r.bachelors_or_higher))))
            .collect();
        let data = serde_json::to_string(&records)
            .context("Failed to serialize education records")?
            .replace("</", "<\\/");

        let mut html = String::from("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        html.push_str("<meta charset=\"utf-8\">\n");
        html.push_str(&format!("<title>{}</title>\n", escape_xml(&self.config.title)));
        html.push_str("<style>\n");
        html.push_str("  body { font-family: sans-serif; }\n");
        html.push_str("  #tooltip { position: absolute; opacity: 0; pointer-events: none; padding: 6px 10px; background: #fff; border: 1px solid #888; border-radius: 4px; }\n");
        html.push_str("  .county:hover { stroke: #000; stroke-width: 0.5; }\n");
        html.push_str("</style>\n</head>\n<body>\n");
        html.push_str(&self.to_svg());
        html.push_str("<div id=\"tooltip\"></div>\n<script>\n");
        html.push_str(&format!("const educationById = {};\n", data));
        html.push_str(&tooltip::hover_script());
        html.push_str("</script>\n</body>\n</html>\n");
        Ok(html)
    }
}

/// Writes the SVG and HTML documents under `output.dir`.
pub fn write_outputs(config: &AppConfig, map: &ChoroplethMap) -> Result<(PathBuf, PathBuf)> {
    let dir = &config.output.dir;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory {:?}", dir))?;

    let svg_path = dir.join(&config.output.svg_file);
    fs::write(&svg_path, map.to_svg()).with_context(|| format!("Failed to write {:?}", svg_path))?;

    let html_path = dir.join(&config.output.html_file);
    fs::write(&html_path, map.to_html()?).with_context(|| format!("Failed to write {:?}", html_path))?;

    tracing::info!("Wrote {:?} and {:?}", svg_path, html_path);
    Ok((svg_path, html_path))
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

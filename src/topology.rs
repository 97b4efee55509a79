//! TopoJSON decoding.
//!
//! A topology stores every boundary once as an arc; polygons reference arcs by
//! index, with `~i` (that is `-i - 1`) meaning arc `i` walked backwards. When a
//! `transform` is present the arcs are quantized and delta-encoded.

use crate::types::{County, Fips};
use anyhow::{anyhow, bail, Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
pub struct Topology {
    #[serde(default)]
    pub transform: Option<Transform>,
    pub arcs: Vec<Vec<Vec<f64>>>,
    pub objects: HashMap<String, TopoGeometry>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

/// Geometry object as stored in the topology. `arcs` is kept loosely typed
/// because its nesting depth depends on `kind`.
#[derive(Debug, Deserialize)]
pub struct TopoGeometry {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub arcs: Option<Value>,
    #[serde(default)]
    pub geometries: Vec<TopoGeometry>,
}

impl Topology {
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context("Failed to parse TopoJSON topology")
    }

    /// Decodes every polygonal geometry of `object` into a county.
    ///
    /// Geometries without a usable numeric id, or of a non-polygonal type,
    /// are skipped.
    pub fn counties(&self, object: &str) -> Result<Vec<County>> {
        let root = self
            .objects
            .get(object)
            .ok_or_else(|| anyhow!("Topology has no object named '{}'", object))?;
        let arcs = self.decode_arcs();

        let mut counties = Vec::new();
        let mut skipped = 0usize;
        collect_counties(root, &arcs, &mut counties, &mut skipped)?;
        if skipped > 0 {
            tracing::debug!("Skipped {} geometries without id or polygon type", skipped);
        }
        Ok(counties)
    }

    fn decode_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| match self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .filter(|p| p.len() >= 2)
                        .map(|p| {
                            x += p[0];
                            y += p[1];
                            Coord {
                                x: x * t.scale[0] + t.translate[0],
                                y: y * t.scale[1] + t.translate[1],
                            }
                        })
                        .collect()
                }
                None => arc
                    .iter()
                    .filter(|p| p.len() >= 2)
                    .map(|p| Coord { x: p[0], y: p[1] })
                    .collect(),
            })
            .collect()
    }
}

fn collect_counties(
    geometry: &TopoGeometry,
    arcs: &[Vec<Coord<f64>>],
    out: &mut Vec<County>,
    skipped: &mut usize,
) -> Result<()> {
    let kind = geometry.kind.as_deref().unwrap_or("");
    if kind == "GeometryCollection" {
        for child in &geometry.geometries {
            collect_counties(child, arcs, out, skipped)?;
        }
        return Ok(());
    }

    let id = match geometry.id.as_ref().and_then(parse_fips) {
        Some(id) => id,
        None => {
            *skipped += 1;
            return Ok(());
        }
    };
    let arc_refs = match &geometry.arcs {
        Some(value) => value,
        None => {
            *skipped += 1;
            return Ok(());
        }
    };

    let polygons = match kind {
        "Polygon" => {
            let rings: Vec<Vec<i64>> = serde_json::from_value(arc_refs.clone())
                .with_context(|| format!("Malformed arcs for Polygon {}", id))?;
            vec![polygon(arcs, &rings)?]
        }
        "MultiPolygon" => {
            let parts: Vec<Vec<Vec<i64>>> = serde_json::from_value(arc_refs.clone())
                .with_context(|| format!("Malformed arcs for MultiPolygon {}", id))?;
            parts
                .iter()
                .map(|rings| polygon(arcs, rings))
                .collect::<Result<Vec<_>>>()?
        }
        _ => {
            *skipped += 1;
            return Ok(());
        }
    };

    out.push(County {
        id,
        geometry: MultiPolygon::new(polygons),
    });
    Ok(())
}

fn polygon(arcs: &[Vec<Coord<f64>>], rings: &[Vec<i64>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|r| ring(arcs, r));
    let exterior = match rings.next() {
        Some(exterior) => exterior?,
        None => LineString::new(Vec::new()),
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

/// Stitches arcs into one ring; each arc after the first starts on the
/// previous arc's last point, which is emitted only once.
fn ring(arcs: &[Vec<Coord<f64>>], indices: &[i64]) -> Result<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::new();
    for &index in indices {
        let (arc_index, reversed) = if index < 0 {
            ((!index) as usize, true)
        } else {
            (index as usize, false)
        };
        let arc = arcs
            .get(arc_index)
            .ok_or_else(|| anyhow!("Arc index {} out of range ({} arcs)", index, arcs.len()))?;

        let skip = usize::from(!coords.is_empty());
        if reversed {
            coords.extend(arc.iter().rev().skip(skip).copied());
        } else {
            coords.extend(arc.iter().skip(skip).copied());
        }
    }
    if coords.is_empty() {
        bail!("Ring references no coordinates");
    }
    Ok(LineString::new(coords))
}

/// Accepts numeric ids as well as zero-padded strings such as `"01001"`.
pub fn parse_fips(id: &Value) -> Option<Fips> {
    match id {
        Value::Number(n) => n.as_u64().and_then(|n| Fips::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

//! Projection of county geometry onto the canvas and SVG path generation.

use crate::types::County;
use geo::{BoundingRect, Coord, MapCoords, MultiPolygon, Rect};
use serde::Deserialize;
use std::f64::consts::PI;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionKind {
    /// Source coordinates are already planar canvas units
    #[default]
    Identity,
    /// Source coordinates are lon/lat degrees; Web Mercator fitted to the canvas
    Mercator,
}

pub trait Projection: Send + Sync {
    fn project(&self, coord: Coord<f64>) -> Coord<f64>;
}

pub struct Identity;

impl Projection for Identity {
    fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        coord
    }
}

/// Web Mercator scaled and centered so the given extent fills the viewport.
#[derive(Debug, Clone, Copy)]
pub struct FittedMercator {
    k: f64,
    tx: f64,
    ty: f64,
}

impl FittedMercator {
    pub fn fit(extent: Rect<f64>, width: f64, height: f64) -> Self {
        let min = mercator(extent.min());
        let max = mercator(extent.max());
        let dx = (max.x - min.x).max(f64::EPSILON);
        let dy = (max.y - min.y).max(f64::EPSILON);
        let k = (width / dx).min(height / dy);
        Self {
            k,
            tx: (width - k * dx) / 2.0 - k * min.x,
            ty: (height - k * dy) / 2.0 + k * max.y,
        }
    }
}

impl Projection for FittedMercator {
    fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        let m = mercator(coord);
        Coord {
            x: self.k * m.x + self.tx,
            y: -self.k * m.y + self.ty,
        }
    }
}

// Unscaled spherical Mercator; y grows northwards
fn mercator(coord: Coord<f64>) -> Coord<f64> {
    let lat = coord.y.clamp(-85.0511, 85.0511).to_radians();
    Coord {
        x: coord.x.to_radians(),
        y: (PI / 4.0 + lat / 2.0).tan().ln(),
    }
}

/// Chooses the projection for `kind`, fitting Mercator to the counties' extent.
pub fn build(
    kind: ProjectionKind,
    counties: &[County],
    width: f64,
    height: f64,
) -> Box<dyn Projection> {
    match kind {
        ProjectionKind::Identity => Box::new(Identity),
        ProjectionKind::Mercator => match extent(counties) {
            Some(rect) => Box::new(FittedMercator::fit(rect, width, height)),
            None => Box::new(Identity),
        },
    }
}

fn extent(counties: &[County]) -> Option<Rect<f64>> {
    counties
        .iter()
        .filter_map(|c| c.geometry.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                Coord {
                    x: a.min().x.min(b.min().x),
                    y: a.min().y.min(b.min().y),
                },
                Coord {
                    x: a.max().x.max(b.max().x),
                    y: a.max().y.max(b.max().y),
                },
            )
        })
}

pub fn project_geometry(projection: &dyn Projection, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    geometry.map_coords(|c| projection.project(c))
}

/// Renders already-projected geometry as SVG path data (`M x,y L x,y ... Z`
/// per ring).
pub fn svg_path(geometry: &MultiPolygon<f64>) -> String {
    let mut d = String::new();
    for polygon in geometry {
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            let mut coords = ring.0.as_slice();
            if coords.len() > 1 && coords.first() == coords.last() {
                coords = &coords[..coords.len() - 1];
            }
            for (i, c) in coords.iter().enumerate() {
                let cmd = if i == 0 { 'M' } else { 'L' };
                let _ = write!(d, "{}{},{}", cmd, round3(c.x), round3(c.y));
            }
            if !coords.is_empty() {
                d.push('Z');
            }
        }
    }
    d
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(id: u32, x0: f64, y0: f64, size: f64) -> County {
        County {
            id,
            geometry: MultiPolygon::new(vec![polygon![
                (x: x0, y: y0),
                (x: x0 + size, y: y0),
                (x: x0 + size, y: y0 + size),
                (x: x0, y: y0 + size),
            ]]),
        }
    }

    #[test]
    fn identity_path_uses_source_coordinates() {
        let county = square(1, 0.0, 0.0, 10.0);
        let projected = project_geometry(&Identity, &county.geometry);
        assert_eq!(svg_path(&projected), "M0,0L10,0L10,10L0,10Z");
    }

    #[test]
    fn path_rounds_to_three_decimals() {
        let county = square(1, 0.12345, 1.0 / 3.0, 1.0);
        let d = svg_path(&county.geometry);
        assert!(d.starts_with("M0.123,0.333L1.123,0.333"), "{}", d);
    }

    #[test]
    fn empty_geometry_gives_empty_path() {
        assert_eq!(svg_path(&MultiPolygon::new(Vec::new())), "");
    }

    #[test]
    fn mercator_fit_stays_inside_viewport() {
        let counties = vec![square(1, -125.0, 24.0, 10.0), square(2, -77.0, 40.0, 10.0)];
        let projection = build(ProjectionKind::Mercator, &counties, 960.0, 600.0);
        for county in &counties {
            let projected = project_geometry(projection.as_ref(), &county.geometry);
            let rect = projected.bounding_rect().unwrap();
            assert!(rect.min().x >= -1e-6 && rect.max().x <= 960.0 + 1e-6);
            assert!(rect.min().y >= -1e-6 && rect.max().y <= 600.0 + 1e-6);
        }
    }

    #[test]
    fn mercator_puts_north_at_the_top() {
        let counties = vec![square(1, -100.0, 30.0, 10.0)];
        let projection = build(ProjectionKind::Mercator, &counties, 500.0, 500.0);
        let south = projection.project(Coord { x: -95.0, y: 31.0 });
        let north = projection.project(Coord { x: -95.0, y: 39.0 });
        assert!(north.y < south.y);
    }
}

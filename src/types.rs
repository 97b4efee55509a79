use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

/// Numeric county identifier ("fips" code).
pub type Fips = u32;

/// One row of the education dataset.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EducationRecord {
    pub fips: Fips,
    #[serde(default)]
    pub state: Option<String>,
    pub area_name: String,
    // Percentage (0-100) of adults holding a bachelor's degree or higher
    #[serde(rename = "bachelorsOrHigher")]
    pub bachelors_or_higher: f64,
}

/// A county boundary decoded from the topology, still in source coordinates.
#[derive(Debug, Clone)]
pub struct County {
    pub id: Fips,
    pub geometry: MultiPolygon<f64>,
}

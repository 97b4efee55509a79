use crate::config::AppConfig;
use crate::topology::{parse_fips, Topology};
use crate::types::{County, EducationRecord};
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use geojson::GeoJson;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

/// Where a dataset comes from: a remote URL or a file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
}

impl Source {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            Source::Url(location.to_string())
        } else {
            Source::File(PathBuf::from(location))
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{}", url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches both datasets concurrently and parses them. Fails if either
/// source fails; there is no retry.
pub async fn load_data(config: &AppConfig) -> Result<(Vec<County>, Vec<EducationRecord>)> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.input.timeout_secs))
        .build()
        .context("Failed to build HTTP client")?;

    let topology_source = Source::parse(&config.input.topology);
    let education_source = Source::parse(&config.input.education);
    tracing::info!("Loading {} and {}", topology_source, education_source);

    let (topology_bytes, education_bytes) = tokio::try_join!(
        fetch_bytes(&client, &topology_source),
        fetch_bytes(&client, &education_source)
    )?;

    let counties = parse_counties(&topology_bytes, &config.input.topology_object)
        .with_context(|| format!("Invalid county geometry from {}", topology_source))?;
    let records = parse_education(&education_bytes)
        .with_context(|| format!("Invalid education data from {}", education_source))?;

    tracing::info!(
        "Loaded {} county shapes and {} education records",
        counties.len(),
        records.len()
    );
    Ok((counties, records))
}

pub async fn fetch_bytes(client: &Client, source: &Source) -> Result<Vec<u8>> {
    match source {
        Source::Url(url) => {
            let response = client
                .get(url)
                .send()
                .await
                .with_context(|| format!("Request to {} failed", url))?
                .error_for_status()
                .with_context(|| format!("Bad response from {}", url))?;
            let bytes = response
                .bytes()
                .await
                .with_context(|| format!("Failed to read body from {}", url))?;
            Ok(bytes.to_vec())
        }
        Source::File(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {:?}", path)),
    }
}

pub fn parse_education(bytes: &[u8]) -> Result<Vec<EducationRecord>> {
    serde_json::from_slice(bytes).context("Failed to parse education records")
}

/// Decodes county geometry from either a TopoJSON topology or a GeoJSON
/// FeatureCollection, detected by the document's `type`.
pub fn parse_counties(bytes: &[u8], object: &str) -> Result<Vec<County>> {
    #[derive(serde::Deserialize)]
    struct Kind {
        #[serde(rename = "type")]
        kind: Option<String>,
    }
    let kind: Kind = serde_json::from_slice(bytes).context("Geometry document is not JSON")?;

    match kind.kind.as_deref() {
        Some("Topology") => Topology::from_slice(bytes)?.counties(object),
        Some("FeatureCollection") => load_geojson_counties(bytes),
        other => Err(anyhow!("Unsupported geometry document type: {:?}", other)),
    }
}

fn load_geojson_counties(bytes: &[u8]) -> Result<Vec<County>> {
    let geojson = GeoJson::from_reader(bytes).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let mut counties = Vec::new();

    for feature in collection.features {
        // 1. Get ID, from the feature itself or its properties
        let id_val = match &feature.id {
            Some(geojson::feature::Id::String(s)) => Some(serde_json::Value::String(s.clone())),
            Some(geojson::feature::Id::Number(n)) => Some(serde_json::Value::Number(n.clone())),
            None => feature
                .properties
                .as_ref()
                .and_then(|props| props.get("fips").or_else(|| props.get("id")))
                .cloned(),
        };
        let id = match id_val.as_ref().and_then(parse_fips) {
            Some(id) => id,
            None => continue,
        };

        // 2. Get Geometry
        let geometry = match feature.geometry {
            Some(geom) => {
                let valid_geo: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;

                match valid_geo {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };

        counties.push(County { id, geometry });
    }

    Ok(counties)
}

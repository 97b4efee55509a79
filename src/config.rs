use crate::projection::ProjectionKind;
use crate::scale::{BLUES_9, BUCKET_COUNT};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOPOLOGY_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/counties.json";
pub const DEFAULT_EDUCATION_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/for_user_education.json";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub render: RenderConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// URL or local path of the county topology (TopoJSON or GeoJSON)
    pub topology: String,
    /// URL or local path of the education records
    pub education: String,
    pub topology_object: String,
    pub timeout_secs: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            topology: DEFAULT_TOPOLOGY_URL.to_string(),
            education: DEFAULT_EDUCATION_URL.to_string(),
            topology_object: "counties".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RenderConfig {
    pub width: f64,
    pub height: f64,
    /// Vertical offset of the county group, leaving room for the titles
    pub map_offset_y: f64,
    pub projection: ProjectionKind,
    pub palette: Vec<String>, // Hex codes, lightest first
    pub fallback_color: String,
    pub title: String,
    pub description: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 900.0,
            map_offset_y: 100.0,
            projection: ProjectionKind::default(),
            palette: BLUES_9.iter().map(|c| c.to_string()).collect(),
            fallback_color: "#ccc".to_string(),
            title: "Education of America".to_string(),
            description: "Color represents the percentage of education".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub svg_file: String,
    pub html_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            svg_file: "map.svg".to_string(),
            html_file: "index.html".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise falls back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.render.validate()
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.palette.len() != BUCKET_COUNT {
            bail!(
                "render.palette must list exactly {} colors, found {}",
                BUCKET_COUNT,
                self.palette.len()
            );
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            bail!(
                "render.width and render.height must be positive (got {}x{})",
                self.width,
                self.height
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_published_map() {
        let config = AppConfig::default();
        assert_eq!(config.input.topology, DEFAULT_TOPOLOGY_URL);
        assert_eq!(config.input.topology_object, "counties");
        assert_eq!(config.render.width, 960.0);
        assert_eq!(config.render.height, 900.0);
        assert_eq!(config.render.palette.len(), BUCKET_COUNT);
        assert_eq!(config.render.fallback_color, "#ccc");
        config.validate().unwrap();
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[input]\neducation = \"data/education.json\"\n\n[server]\nport = 3000\n"
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.input.education, "data/education.json");
        assert_eq!(config.input.topology, DEFAULT_TOPOLOGY_URL);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.output.svg_file, "map.svg");
        assert_eq!(config.render.projection, ProjectionKind::Identity);
    }

    #[test]
    fn projection_kind_parses_lowercase() {
        let config: AppConfig = toml::from_str("[render]\nprojection = \"mercator\"\n").unwrap();
        assert_eq!(config.render.projection, ProjectionKind::Mercator);
    }

    #[test]
    fn palette_of_wrong_length_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[render]\npalette = [\"#fff\", \"#000\"]\n").unwrap();

        let err = AppConfig::load_from_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("exactly 9 colors"));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.server.port, 8080);
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub classification: ClassificationConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub neighborhoods: PathBuf,
    pub groups: PathBuf,
    pub demographics: PathBuf,
    /// Feature property holding the neighborhood name.
    #[serde(default = "default_name_property")]
    pub name_property: String,
}

fn default_name_property() -> String {
    "NAME".to_string()
}

/// Threshold and color tables for both color modes. The defaults
/// reproduce the palette the map shipped with; overriding them in the
/// TOML is how variants (different palettes, different bin sets) are
/// expressed instead of forking the code.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Age bucket label counted as "over 65".
    pub over_65_bucket: String,
    /// Descending thresholds; first step whose bound the percentage
    /// strictly exceeds wins.
    pub age_steps: Vec<AgeStep>,
    /// Color for percentages at or below the lowest threshold.
    pub age_fallback_color: String,
    /// Income bins in ascending range order, with their colors.
    pub income_bins: Vec<IncomeBin>,
    /// Fill for features with no usable demographics.
    pub no_data_color: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgeStep {
    pub min_percent: f64,
    pub color: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IncomeBin {
    pub label: String,
    pub color: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        let step = |min_percent: f64, color: &str| AgeStep {
            min_percent,
            color: color.to_string(),
        };
        let bin = |label: &str, color: &str| IncomeBin {
            label: label.to_string(),
            color: color.to_string(),
        };
        ClassificationConfig {
            over_65_bucket: "Over 65".to_string(),
            age_steps: vec![
                step(30.0, "#08306b"),
                step(20.0, "#2171b5"),
                step(15.0, "#4292c6"),
                step(10.0, "#6baed6"),
                step(5.0, "#9ecae1"),
                step(2.0, "#c6dbef"),
            ],
            age_fallback_color: "#d9ecff".to_string(),
            income_bins: vec![
                bin("Less than $50,000", "#fff5d6"),
                bin("$50,000 to $74,999", "#fde7a3"),
                bin("$75,000 to $99,999", "#fbc75d"),
                bin("$100,000 to $149,999", "#f5a623"),
                bin("$150,000 to $199,999", "#e18c0d"),
                bin("$200,000 or more", "#b05e00"),
            ],
            no_data_color: "#f2efe7".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory for styled FeatureCollections written by `generate`.
    pub styled_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Below this zoom the map shows merged groups.
    #[serde(default = "default_group_zoom_threshold")]
    pub group_zoom_threshold: f64,
    /// Directory of static front-end assets to serve at `/`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

fn default_group_zoom_threshold() -> f64 {
    13.0
}

fn default_static_dir() -> PathBuf {
    PathBuf::from(".")
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_defaults_apply_when_section_omitted() {
        let toml_src = r#"
            [input]
            neighborhoods = "Neighborhoods.geojson"
            groups = "groups.json"
            demographics = "demographics.json"

            [output]
            styled_dir = "out"

            [server]
            port = 3000
        "#;
        let config: AppConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.input.name_property, "NAME");
        assert_eq!(config.classification.age_steps.len(), 6);
        assert_eq!(config.classification.income_bins.len(), 6);
        assert_eq!(config.classification.over_65_bucket, "Over 65");
        assert_eq!(config.server.group_zoom_threshold, 13.0);
    }

    #[test]
    fn classification_tables_are_overridable() {
        // Hex colors contain `"#`, so the raw string needs wider
        // delimiters.
        let toml_src = r##"
            [input]
            neighborhoods = "n.geojson"
            groups = "g.json"
            demographics = "d.json"
            name_property = "name"

            [classification]
            over_65_bucket = "65+"
            age_steps = [{ min_percent = 50.0, color = "#000000" }]
            age_fallback_color = "#ffffff"
            income_bins = [{ label = "Any", color = "#123456" }]
            no_data_color = "#cccccc"

            [output]
            styled_dir = "out"

            [server]
            port = 3000
            group_zoom_threshold = 11.0
        "##;
        let config: AppConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.classification.over_65_bucket, "65+");
        assert_eq!(config.classification.age_steps.len(), 1);
        assert_eq!(config.server.group_zoom_threshold, 11.0);
    }
}

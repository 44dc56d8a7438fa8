use crate::config::AppConfig;
use crate::types::{DemographicRecord, GroupMap, MapData, Neighborhood};
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use geojson::GeoJson;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

pub fn load_data(config: &AppConfig) -> Result<MapData> {
    info!("Loading data...");

    let neighborhoods =
        load_neighborhoods(&config.input.neighborhoods, &config.input.name_property)?;
    info!("Loaded {} neighborhood features", neighborhoods.len());

    let groups: GroupMap = read_json(&config.input.groups)
        .with_context(|| format!("Failed to load groups from {:?}", config.input.groups))?;
    info!("Loaded {} group definitions", groups.len());

    let demographics: HashMap<String, DemographicRecord> = read_json(&config.input.demographics)
        .with_context(|| {
            format!(
                "Failed to load demographics from {:?}",
                config.input.demographics
            )
        })?;
    info!("Loaded demographics for {} neighborhoods", demographics.len());

    let names: HashSet<&str> = neighborhoods.iter().map(|n| n.name.as_str()).collect();
    for name in demographics.keys() {
        if !names.contains(name.as_str()) {
            warn!("Demographics for {:?} match no neighborhood feature", name);
        }
    }

    Ok(MapData {
        neighborhoods,
        groups,
        demographics,
    })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let value = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON in {:?}", path))?;
    Ok(value)
}

/// Parses the boundary FeatureCollection. Features without a usable
/// name property or without polygon geometry are skipped; duplicate
/// names are an input error since name is the feature identity.
fn load_neighborhoods(path: &Path, name_property: &str) -> Result<Vec<Neighborhood>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open neighborhoods GeoJSON: {:?}", path))?;
    let reader = BufReader::new(file);

    // Parses the whole file into memory; the dataset is small.
    let geojson = GeoJson::from_reader(reader).context("Failed to parse neighborhoods GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Neighborhoods GeoJSON must be a FeatureCollection")),
    };

    let mut neighborhoods: Vec<Neighborhood> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for feature in collection.features {
        let name_val = feature
            .properties
            .as_ref()
            .and_then(|props| props.get(name_property));

        let name = match name_val {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => {
                warn!("Skipping feature without {:?} property", name_property);
                continue;
            }
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let converted: geo::Geometry<f64> = geom
                    .value
                    .try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry for {:?}: {:?}", name, e))?;
                match converted {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => {
                        warn!("Skipping non-polygon feature {:?}", name);
                        continue;
                    }
                }
            }
            None => continue,
        };

        if !seen.insert(name.clone()) {
            return Err(anyhow!("Duplicate neighborhood name in input: {:?}", name));
        }

        neighborhoods.push(Neighborhood { name, geometry });
    }

    Ok(neighborhoods)
}

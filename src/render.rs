use crate::classify::{color_for_age, color_for_income, median_income_bin, percent_over_65};
use crate::config::{AppConfig, ClassificationConfig};
use crate::demographics::merge;
use crate::grouping::{resolve, GroupMode, ResolveError};
use crate::state::{ColorMode, ViewState};
use crate::types::{DemographicRecord, MapData, Neighborhood};
use anyhow::{Context, Result};
use geo::MultiPolygon;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use tracing::{info, warn};

/// Everything the front end needs for one redraw: styled features, the
/// legend for the active color mode, and the comparison summary when a
/// selection exists.
#[derive(Debug)]
pub struct RenderInstructions {
    pub features: Vec<StyledFeature>,
    pub legend: Legend,
    pub selection: Option<SelectionSummary>,
}

#[derive(Debug)]
pub struct StyledFeature {
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    pub style: FeatureStyle,
    pub popup: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureStyle {
    pub color: String,
    pub weight: u32,
    pub fill_color: String,
    pub fill_opacity: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct LegendEntry {
    pub color: String,
    pub label: String,
}

/// Combined statistics over the user's selected neighborhoods,
/// recomputed from scratch on every selection change.
#[derive(Debug, Serialize, PartialEq)]
pub struct SelectionSummary {
    pub names: Vec<String>,
    pub median_income_bin: Option<String>,
    pub percent_over_65: Option<f64>,
    pub total_population: u64,
    pub income_breakdown: Vec<BucketShare>,
    pub age_breakdown: Vec<BucketShare>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct BucketShare {
    pub label: String,
    pub count: u32,
    /// Share of the table total; `None` when the total is zero.
    pub percent: Option<f64>,
}

/// Pure function of (state, data): resolves the feature set for the
/// state's group mode, classifies every feature, and derives legend
/// and selection output. Nothing here touches the network or the
/// filesystem.
pub fn render(
    state: &ViewState,
    data: &MapData,
    tables: &ClassificationConfig,
) -> Result<RenderInstructions, ResolveError> {
    let resolved = resolve(data.neighborhoods.clone(), &data.groups, state.group_mode)?;

    let features: Vec<StyledFeature> = resolved
        .into_par_iter()
        .map(|feature| style_feature(feature, state, data, tables))
        .collect();

    let selection = if state.selection.is_empty() {
        None
    } else {
        Some(selection_summary(&state.selection, data, tables))
    };

    Ok(RenderInstructions {
        features,
        legend: legend_for(state.color_mode, tables),
        selection,
    })
}

/// Demographics for a display feature: merged over members when the
/// name is a group, looked up directly otherwise. `None` means no
/// usable data (including a group whose members have data gaps, which
/// degrades to no-data instead of failing the whole redraw).
pub fn feature_record(name: &str, data: &MapData) -> Option<DemographicRecord> {
    match data.groups.get(name) {
        Some(members) => {
            match merge(members.iter().map(String::as_str), &data.demographics) {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!("Cannot merge demographics for group {:?}: {}", name, err);
                    None
                }
            }
        }
        None => data.demographics.get(name).cloned(),
    }
}

fn style_feature(
    feature: Neighborhood,
    state: &ViewState,
    data: &MapData,
    tables: &ClassificationConfig,
) -> StyledFeature {
    let Some(record) = feature_record(&feature.name, data) else {
        return StyledFeature {
            popup: format!("{}\nNo information on neighborhood available", feature.name),
            style: FeatureStyle {
                color: "#999".to_string(),
                weight: 1,
                fill_color: tables.no_data_color.clone(),
                fill_opacity: 0.3,
            },
            name: feature.name,
            geometry: feature.geometry,
        };
    };

    let over_65 = percent_over_65(&record, tables);
    let median_bin = median_income_bin(&record, tables);

    let fill_color = match state.color_mode {
        ColorMode::Age => match over_65 {
            Some(pct) => color_for_age(pct, tables).to_string(),
            None => tables.no_data_color.clone(),
        },
        ColorMode::Income => match median_bin {
            Some(bin) => color_for_income(bin, tables).to_string(),
            None => tables.no_data_color.clone(),
        },
    };

    let popup = format!(
        "{}\nMedian Income: {}\n% Over Age 65: {}",
        feature.name,
        median_bin.unwrap_or("N/A"),
        over_65
            .map(|pct| format!("{:.1}%", pct))
            .unwrap_or_else(|| "N/A".to_string()),
    );

    let (weight, fill_opacity) = if state.is_selected(&feature.name) {
        (3, 0.9)
    } else {
        (1, 0.6)
    };

    StyledFeature {
        name: feature.name,
        geometry: feature.geometry,
        style: FeatureStyle {
            color: "#333".to_string(),
            weight,
            fill_color,
            fill_opacity,
        },
        popup,
    }
}

/// Names with no resolvable demographics are skipped rather than
/// sinking the whole summary; an all-missing selection reports zero
/// totals with no-data sentinels.
pub fn selection_summary(
    selection: &BTreeSet<String>,
    data: &MapData,
    tables: &ClassificationConfig,
) -> SelectionSummary {
    let mut combined = DemographicRecord::default();
    for name in selection {
        let Some(record) = feature_record(name, data) else {
            warn!("Selected {:?} has no demographics, skipping", name);
            continue;
        };
        for (bucket, count) in record.age {
            *combined.age.entry(bucket).or_insert(0) += count;
        }
        for (bucket, count) in record.income {
            *combined.income.entry(bucket).or_insert(0) += count;
        }
    }

    let income_total = combined.income_total();
    let age_total = combined.age_total();

    let mut income_breakdown: Vec<BucketShare> = tables
        .income_bins
        .iter()
        .map(|bin| {
            let count = combined.income.get(&bin.label).copied().unwrap_or(0);
            BucketShare {
                label: bin.label.clone(),
                count,
                percent: share(count, income_total),
            }
        })
        .collect();
    // Buckets outside the configured bin order are appended so the
    // shares still account for the whole total.
    let mut extra_labels: Vec<&str> = combined
        .income
        .keys()
        .map(String::as_str)
        .filter(|label| !tables.income_bins.iter().any(|bin| bin.label == *label))
        .collect();
    extra_labels.sort_unstable();
    income_breakdown.extend(extra_labels.into_iter().map(|label| {
        let count = combined.income[label];
        BucketShare {
            label: label.to_string(),
            count,
            percent: share(count, income_total),
        }
    }));

    let mut age_labels: Vec<&String> = combined.age.keys().collect();
    age_labels.sort();
    let age_breakdown = age_labels
        .into_iter()
        .map(|label| {
            let count = combined.age[label];
            BucketShare {
                label: label.clone(),
                count,
                percent: share(count, age_total),
            }
        })
        .collect();

    SelectionSummary {
        names: selection.iter().cloned().collect(),
        median_income_bin: median_income_bin(&combined, tables).map(str::to_string),
        percent_over_65: percent_over_65(&combined, tables),
        total_population: age_total,
        income_breakdown,
        age_breakdown,
    }
}

fn share(count: u32, total: u64) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(100.0 * f64::from(count) / total as f64)
    }
}

pub fn legend_for(color_mode: ColorMode, tables: &ClassificationConfig) -> Legend {
    match color_mode {
        ColorMode::Age => {
            let mut entries = Vec::new();
            let mut upper: Option<f64> = None;
            for step in &tables.age_steps {
                let label = match upper {
                    None => format!("{}%+", step.min_percent),
                    Some(bound) => format!("{}\u{2013}{}%", step.min_percent, bound),
                };
                entries.push(LegendEntry {
                    color: step.color.clone(),
                    label,
                });
                upper = Some(step.min_percent);
            }
            if let Some(bound) = upper {
                entries.push(LegendEntry {
                    color: tables.age_fallback_color.clone(),
                    label: format!("<{}%", bound),
                });
            }
            Legend {
                title: "% Over Age 65".to_string(),
                entries,
            }
        }
        ColorMode::Income => Legend {
            title: "Median Income".to_string(),
            // Highest range first, matching the on-map reading order.
            entries: tables
                .income_bins
                .iter()
                .rev()
                .map(|bin| LegendEntry {
                    color: bin.color.clone(),
                    label: bin.label.clone(),
                })
                .collect(),
        },
    }
}

/// Styled features as a GeoJSON FeatureCollection, with the style and
/// popup carried in feature properties for a Leaflet-style client.
pub fn to_feature_collection(features: &[StyledFeature]) -> geojson::FeatureCollection {
    let features = features
        .iter()
        .map(|f| {
            let mut properties = geojson::JsonObject::new();
            properties.insert("NAME".to_string(), f.name.clone().into());
            properties.insert("popup".to_string(), f.popup.clone().into());
            properties.insert("color".to_string(), f.style.color.clone().into());
            properties.insert("weight".to_string(), f.style.weight.into());
            properties.insert("fillColor".to_string(), f.style.fill_color.clone().into());
            properties.insert("fillOpacity".to_string(), f.style.fill_opacity.into());
            geojson::Feature {
                bbox: None,
                geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes one styled FeatureCollection per color-mode and group-mode
/// combination into the configured output directory.
pub fn generate_styled(config: &AppConfig, data: &MapData) -> Result<()> {
    fs::create_dir_all(&config.output.styled_dir).with_context(|| {
        format!(
            "Failed to create output directory {:?}",
            config.output.styled_dir
        )
    })?;

    let combinations = [
        (ColorMode::Age, GroupMode::Grouped, "age-grouped"),
        (ColorMode::Age, GroupMode::Ungrouped, "age-ungrouped"),
        (ColorMode::Income, GroupMode::Grouped, "income-grouped"),
        (ColorMode::Income, GroupMode::Ungrouped, "income-ungrouped"),
    ];

    for (color_mode, group_mode, stem) in combinations {
        let state = ViewState {
            color_mode,
            group_mode,
            ..ViewState::default()
        };
        let instructions = render(&state, data, &config.classification)?;
        let collection = to_feature_collection(&instructions.features);

        let path = config.output.styled_dir.join(format!("{stem}.geojson"));
        let file =
            File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
        serde_json::to_writer(BufWriter::new(file), &collection)
            .with_context(|| format!("Failed to write {:?}", path))?;
        info!(
            "Wrote {} features to {:?}",
            instructions.features.len(),
            path
        );
    }

    Ok(())
}

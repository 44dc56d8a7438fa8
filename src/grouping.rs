use crate::types::{GroupMap, Neighborhood};
use geo::BooleanOps;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::warn;

/// Whether the map shows merged groups (low zoom) or every base
/// neighborhood (high zoom).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupMode {
    Grouped,
    Ungrouped,
}

impl GroupMode {
    /// The zoom-driven display toggle: below the threshold the map
    /// shows merged groups.
    pub fn for_zoom(zoom: f64, threshold: f64) -> Self {
        if zoom < threshold {
            GroupMode::Grouped
        } else {
            GroupMode::Ungrouped
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// A merged group shares its name with a passthrough neighborhood
    /// (or two outputs otherwise collide). Name is the feature
    /// identity, so this is an authoring error we refuse to paper over.
    #[error("duplicate feature name in resolved output: {0:?}")]
    DuplicateName(String),
}

/// Partitions features into grouped and ungrouped per the group
/// definitions. Grouped mode folds each group's member polygons into
/// one union (associative, so the left-to-right order only affects
/// intermediate work) and passes unclaimed neighborhoods through
/// unchanged. Pure: no input is mutated.
pub fn resolve(
    features: Vec<Neighborhood>,
    groups: &GroupMap,
    mode: GroupMode,
) -> Result<Vec<Neighborhood>, ResolveError> {
    if mode == GroupMode::Ungrouped {
        return Ok(features);
    }

    let mut used: HashSet<&str> = HashSet::new();
    let mut resolved: Vec<Neighborhood> = Vec::new();

    for (group_name, member_names) in groups {
        // Members are claimed even when the group ends up empty, so a
        // group that references only missing features still removes
        // nothing from the passthrough set by accident later.
        used.extend(member_names.iter().map(String::as_str));

        let mut members = features
            .iter()
            .filter(|f| member_names.iter().any(|m| m == &f.name));

        let Some(first) = members.next() else {
            warn!("Group {:?} matched no features, dropping it", group_name);
            continue;
        };

        let geometry = members.fold(first.geometry.clone(), |acc, next| {
            acc.union(&next.geometry)
        });

        resolved.push(Neighborhood {
            name: group_name.clone(),
            geometry,
        });
    }

    for feature in features {
        if !used.contains(feature.name.as_str()) {
            resolved.push(feature);
        }
    }

    let mut names: HashSet<&str> = HashSet::new();
    for feature in &resolved {
        if !names.insert(feature.name.as_str()) {
            return Err(ResolveError::DuplicateName(feature.name.clone()));
        }
    }

    Ok(resolved)
}

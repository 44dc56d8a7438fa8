use crate::config::AppConfig;
use crate::grouping::GroupMode;
use crate::render::{self, Legend, SelectionSummary};
use crate::state::{ColorMode, ViewState};
use crate::types::{DemographicRecord, MapData};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{Point, Rect};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::info;

// Wrapper for RTree indexing
struct AreaIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for AreaIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub data: MapData,
    pub tree: RTree<AreaIndex>,
    pub config: AppConfig,
}

pub async fn start_server(config: AppConfig, data: MapData) -> Result<()> {
    // Hover lookup runs against the raw (ungrouped) neighborhoods;
    // group membership is resolved per query where needed.
    info!("Building spatial index for API...");
    let tree_items: Vec<AreaIndex> = data
        .neighborhoods
        .iter()
        .enumerate()
        .map(|(i, area)| {
            let rect = area.geometry.bounding_rect().unwrap_or(Rect::new(
                geo::Coord { x: 0.0, y: 0.0 },
                geo::Coord { x: 0.0, y: 0.0 },
            ));
            AreaIndex {
                index: i,
                aabb: AABB::from_corners(
                    [rect.min().x, rect.min().y],
                    [rect.max().x, rect.max().y],
                ),
            }
        })
        .collect();

    let tree = RTree::bulk_load(tree_items);
    info!("Spatial index built.");

    let state = Arc::new(AppState {
        data,
        tree,
        config: config.clone(),
    });

    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    info!("Starting server on http://{}", addr);

    let app = Router::new()
        .route("/api/features", get(features_handler))
        .route("/api/query", get(query_handler))
        .route("/api/selection", get(selection_handler))
        .nest_service("/", ServeDir::new(&config.server.static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[derive(Deserialize)]
pub struct FeatureParams {
    /// Explicit override; otherwise derived from `zoom`.
    mode: Option<GroupMode>,
    zoom: Option<f64>,
    color: Option<ColorMode>,
}

#[derive(Serialize)]
pub struct FeaturesResponse {
    features: geojson::FeatureCollection,
    legend: Legend,
}

async fn features_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FeatureParams>,
) -> Result<Json<FeaturesResponse>, (StatusCode, String)> {
    let group_mode = params.mode.unwrap_or_else(|| {
        GroupMode::for_zoom(
            params.zoom.unwrap_or(0.0),
            state.config.server.group_zoom_threshold,
        )
    });
    let view = ViewState {
        color_mode: params.color.unwrap_or_default(),
        group_mode,
        ..ViewState::default()
    };

    let instructions = render::render(&view, &state.data, &state.config.classification)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(FeaturesResponse {
        features: render::to_feature_collection(&instructions.features),
        legend: instructions.legend,
    }))
}

#[derive(Deserialize)]
pub struct QueryParams {
    lat: f64,
    lon: f64,
}

#[derive(Serialize)]
pub struct QueryResponse {
    name: String,
    median_income_bin: Option<String>,
    percent_over_65: Option<f64>,
    demographics: Option<DemographicRecord>,
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<QueryResponse>> {
    let point = Point::new(params.lon, params.lat);
    let envelope = AABB::from_point([params.lon, params.lat]);

    let candidates = state.tree.locate_in_envelope_intersecting(&envelope);

    for candidate in candidates {
        if let Some(area) = state.data.neighborhoods.get(candidate.index) {
            if area.geometry.contains(&point) {
                let tables = &state.config.classification;
                let record = render::feature_record(&area.name, &state.data);
                return Json(Some(QueryResponse {
                    name: area.name.clone(),
                    median_income_bin: record
                        .as_ref()
                        .and_then(|r| crate::classify::median_income_bin(r, tables))
                        .map(str::to_string),
                    percent_over_65: record
                        .as_ref()
                        .and_then(|r| crate::classify::percent_over_65(r, tables)),
                    demographics: record,
                }));
            }
        }
    }

    Json(None)
}

#[derive(Deserialize)]
pub struct SelectionParams {
    /// Comma-separated neighborhood or group names.
    names: String,
}

async fn selection_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<SelectionSummary>, (StatusCode, String)> {
    let selection: BTreeSet<String> = params
        .names
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if selection.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "names must list at least one neighborhood".to_string(),
        ));
    }

    Ok(Json(render::selection_summary(
        &selection,
        &state.data,
        &state.config.classification,
    )))
}

use crate::config::AppConfig;
use crate::legend::Legend;
use crate::render::{ChoroplethMap, CountyShape};
use crate::tooltip::{Pointer, Tooltip, TooltipPayload, TooltipState};
use crate::types::Fips;
use anyhow::Result;
use axum::{
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use geo::algorithm::contains::Contains;
use geo::{BoundingRect, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

// Wrapper for RTree indexing
pub struct ShapeIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for ShapeIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub map: ChoroplethMap,
    pub tree: RTree<ShapeIndex>,
}

impl AppState {
    pub fn new(map: ChoroplethMap) -> Self {
        let items: Vec<ShapeIndex> = map
            .shapes
            .iter()
            .enumerate()
            .filter_map(|(i, shape)| {
                let rect = shape.geometry.bounding_rect()?;
                Some(ShapeIndex {
                    index: i,
                    aabb: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                })
            })
            .collect();
        let tree = RTree::bulk_load(items);
        Self { map, tree }
    }

    /// County under the canvas point `(x, y)`, accounting for the map group offset.
    pub fn county_at(&self, x: f64, y: f64) -> Option<&CountyShape> {
        let (x, y) = (x, y - self.map.config.map_offset_y);
        let point = Point::new(x, y);
        let envelope = AABB::from_point([x, y]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.map.shapes.get(candidate.index))
            .find(|shape| shape.geometry.contains(&point))
    }
}

// Canvas point for `/api/query`, page position for `/api/hover`
#[derive(Deserialize)]
pub struct QueryParams {
    x: f64,
    y: f64,
}

pub fn router(state: Arc<AppState>, static_dir: &Path) -> Router {
    Router::new()
        .route("/api/county/:fips", get(county_handler))
        .route("/api/query", get(query_handler))
        .route("/api/hover/:fips", get(hover_handler))
        .route("/api/legend", get(legend_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(config: AppConfig, map: ChoroplethMap) -> Result<()> {
    tracing::info!("Building spatial index for {} counties...", map.shapes.len());
    let state = Arc::new(AppState::new(map));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    tracing::info!("Starting server on http://{}", addr);

    let app = router(state, &config.output.dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn county_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(fips): UrlPath<Fips>,
) -> Json<Option<TooltipPayload>> {
    Json(state.map.payload(fips))
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> Json<Option<TooltipPayload>> {
    Json(
        state
            .county_at(params.x, params.y)
            .and_then(|shape| state.map.payload(shape.fips)),
    )
}

/// Tooltip state after the pointer enters county `fips` at page position `(x, y)`.
async fn hover_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(fips): UrlPath<Fips>,
    Query(params): Query<QueryParams>,
) -> Result<Json<TooltipState>, StatusCode> {
    if state.map.shape(fips).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }
    let pointer = Pointer {
        page_x: params.x,
        page_y: params.y,
    };
    let mut tooltip = Tooltip::new();
    tooltip.handle(&state.map.hover(fips, pointer));
    Ok(Json(tooltip.state().clone()))
}

async fn legend_handler(State(state): State<Arc<AppState>>) -> Json<Legend> {
    Json(state.map.legend.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderConfig;
    use crate::render::build_map;
    use crate::types::{County, EducationRecord};
    use axum::body::Body;
    use axum::http::Request;
    use geo::{polygon, MultiPolygon};
    use tower::ServiceExt;

    fn square(id: Fips, x0: f64) -> County {
        County {
            id,
            geometry: MultiPolygon::new(vec![polygon![
                (x: x0, y: 0.0),
                (x: x0 + 10.0, y: 0.0),
                (x: x0 + 10.0, y: 10.0),
                (x: x0, y: 10.0),
            ]]),
        }
    }

    fn state() -> Arc<AppState> {
        let records = vec![
            EducationRecord {
                fips: 1,
                state: Some("AL".to_string()),
                area_name: "A".to_string(),
                bachelors_or_higher: 10.0,
            },
            EducationRecord {
                fips: 2,
                state: Some("AL".to_string()),
                area_name: "B".to_string(),
                bachelors_or_higher: 90.0,
            },
        ];
        let counties = vec![square(1, 0.0), square(2, 20.0), square(3, 40.0)];
        let map = build_map(&RenderConfig::default(), counties, records).unwrap();
        Arc::new(AppState::new(map))
    }

    async fn get_json(uri: &str) -> (StatusCode, serde_json::Value) {
        let dir = tempfile::tempdir().unwrap();
        let app = router(state(), dir.path());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[test]
    fn hit_test_applies_map_offset() {
        let state = state();
        // Canvas y = 105 is y = 5 inside the county group
        assert_eq!(state.county_at(5.0, 105.0).map(|s| s.fips), Some(1));
        assert_eq!(state.county_at(25.0, 105.0).map(|s| s.fips), Some(2));
        assert!(state.county_at(5.0, 5.0).is_none());
        assert!(state.county_at(15.0, 105.0).is_none());
    }

    #[tokio::test]
    async fn county_endpoint_returns_tooltip_payload() {
        let (status, body) = get_json("/api/county/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["area_name"], "B");
        assert_eq!(body["tooltip"], "B: 90%");
        assert_eq!(body["color"], "#08306b");
    }

    #[tokio::test]
    async fn county_without_record_returns_null() {
        let (_, body) = get_json("/api/county/3").await;
        assert!(body.is_null());
    }

    #[tokio::test]
    async fn query_hit_returns_county_payload() {
        let (status, body) = get_json("/api/query?x=5&y=105").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fips"], 1);
        assert_eq!(body["area_name"], "A");
        assert_eq!(body["state"], "AL");
        assert_eq!(body["education"], 10.0);
        assert_eq!(body["color"], "#f7fbff");
        assert_eq!(body["tooltip"], "A: 10%");
    }

    #[tokio::test]
    async fn query_on_unmatched_county_or_empty_space_is_null() {
        let (_, unmatched) = get_json("/api/query?x=45&y=105").await;
        assert!(unmatched.is_null());
        let (_, outside) = get_json("/api/query?x=15&y=105").await;
        assert!(outside.is_null());
    }

    #[tokio::test]
    async fn hover_endpoint_positions_visible_tooltip() {
        let (status, body) = get_json("/api/hover/2?x=300&y=400").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["opacity"], 0.9);
        assert_eq!(body["transition_ms"], 200);
        assert_eq!(body["text"], "B: 90%");
        assert_eq!(body["education"], 90.0);
        assert_eq!(body["left"], 305.0);
        assert_eq!(body["top"], 372.0);
    }

    #[tokio::test]
    async fn hover_on_unmatched_county_stays_hidden() {
        let (status, body) = get_json("/api/hover/3?x=300&y=400").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["opacity"], 0.0);
        assert!(body["education"].is_null());
    }

    #[tokio::test]
    async fn hover_on_unknown_county_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = router(state(), dir.path())
            .oneshot(
                Request::builder()
                    .uri("/api/hover/99?x=0&y=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn legend_endpoint_lists_nine_entries() {
        let (_, body) = get_json("/api/legend").await;
        let entries = body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 9);
        assert_eq!(entries[0]["label"], "10% - 19%");
    }
}

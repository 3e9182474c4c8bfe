use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::geometry;
use crate::query::filter::relation_for;
use crate::query::{Filters, OrderBy, QueryEngine, parse_columns, parse_order_by};
use crate::schema::{self, EntitySchema};
use crate::server::AppState;
use crate::{Error, Value};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult = Result<Json<serde_json::Value>, ApiError>;

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    (status, Json(ErrorResponse { error: error.to_string() }))
}

fn internal(err: impl ToString) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, err)
}

fn from_error(err: Error) -> ApiError {
    match err {
        Error::UnknownEntity(_) => api_error(StatusCode::NOT_FOUND, err),
        other => internal(other),
    }
}

/// Query string split into filters and the reserved `fields`/`order_by` keys
#[derive(Debug, Default, PartialEq)]
pub struct EntityRequest {
    pub filters: Filters,
    pub fields: Vec<String>,
    pub order_by: OrderBy,
}

impl EntityRequest {
    pub fn from_params(params: BTreeMap<String, String>) -> Self {
        let mut request = Self::default();
        for (key, value) in params {
            match key.as_str() {
                "fields" => request.fields = parse_columns(&value),
                "order_by" => request.order_by = parse_order_by(&value),
                _ => {
                    request.filters.insert(key, Value::Text(value));
                }
            }
        }
        request
    }

    /// First column the entity cannot answer for, if any
    pub fn unknown_column(&self, entity: &EntitySchema) -> Option<String> {
        let foreign = relation_for(entity.name).map(|r| r.foreign_keys).unwrap_or_default();

        self.filters
            .keys()
            .filter(|k| !foreign.contains(&k.as_str()))
            .chain(self.fields.iter())
            .chain(self.order_by.iter().map(|(c, _)| c))
            .find(|c| !entity.has_column(c))
            .cloned()
    }
}

pub async fn get_entities(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> ApiResult {
    let entity = schema::entity(&name)
        .ok_or_else(|| from_error(Error::UnknownEntity(name.clone())))?;

    let request = EntityRequest::from_params(params);
    if let Some(column) = request.unknown_column(entity) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            format!("unknown column {column} for {name}"),
        ));
    }

    let store = state.store.lock().await;
    let rows = QueryEngine::new(&store)
        .query(entity.name, &request.filters, &request.fields, &request.order_by)
        .map_err(from_error)?;

    Ok(Json(serde_json::to_value(&rows).map_err(internal)?))
}

fn text_filters(params: BTreeMap<String, String>) -> Filters {
    params.into_iter().map(|(k, v)| (k, Value::Text(v))).collect()
}

pub async fn get_shapes_geojson(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> ApiResult {
    let store = state.store.lock().await;
    let collection = geometry::shapes_as_geojson(&QueryEngine::new(&store), &text_filters(params))
        .map_err(from_error)?;

    Ok(Json(serde_json::to_value(&collection).map_err(internal)?))
}

pub async fn get_stops_geojson(
    State(state): State<Arc<AppState>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> ApiResult {
    let store = state.store.lock().await;
    let collection = geometry::stops_as_geojson(&QueryEngine::new(&store), &text_filters(params))
        .map_err(from_error)?;

    Ok(Json(serde_json::to_value(&collection).map_err(internal)?))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult {
    let stats = state.store.lock().await.stats().map_err(from_error)?;

    let tables: serde_json::Map<String, serde_json::Value> = stats
        .tables
        .iter()
        .map(|(name, rows)| (name.to_string(), serde_json::Value::from(*rows)))
        .collect();

    Ok(Json(serde_json::json!({
        "tables": tables,
        "total": stats.total_rows(),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::OrderDirection;

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_reserved_params_are_not_filters() {
        let request = EntityRequest::from_params(params(&[
            ("route_id", "LOCAL"),
            ("fields", "stop_id,stop_name"),
            ("order_by", "stop_name:desc"),
        ]));

        assert_eq!(request.filters.len(), 1);
        assert_eq!(request.filters.get("route_id"), Some(&Value::from("LOCAL")));
        assert_eq!(request.fields, vec!["stop_id", "stop_name"]);
        assert_eq!(request.order_by, vec![("stop_name".to_string(), OrderDirection::Desc)]);
    }

    #[test]
    fn test_related_filters_are_known_columns() {
        let stops = schema::entity("stops").unwrap();

        let related = EntityRequest::from_params(params(&[("route_id", "LOCAL"), ("direction_id", "0")]));
        assert_eq!(related.unknown_column(stops), None);

        let bogus = EntityRequest::from_params(params(&[("fields", "stop_id,color")]));
        assert_eq!(bogus.unknown_column(stops), Some("color".to_string()));

        let bad_filter = EntityRequest::from_params(params(&[("stop_id", "S1"), ("route_color", "FFF")]));
        assert_eq!(bad_filter.unknown_column(stops), Some("route_color".to_string()));
    }

    #[tokio::test]
    async fn test_entities_handler() {
        let state = Arc::new(AppState {
            store: tokio::sync::Mutex::new(crate::query::test_support::sample_store()),
        });

        let Json(body) = get_entities(
            State(state.clone()),
            Path("routes".to_string()),
            Query(params(&[("stop_id", "S3"), ("fields", "route_id,route_color")])),
        )
        .await
        .unwrap();
        assert_eq!(body, serde_json::json!([{ "route_id": "LOCAL", "route_color": "FFFFFF" }]));

        let (status, Json(error)) = get_entities(State(state.clone()), Path("vehicles".to_string()), Query(BTreeMap::new()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(error.error.contains("vehicles"), "{error:?}");

        let (status, _) = get_entities(
            State(state.clone()),
            Path("stops".to_string()),
            Query(params(&[("route_color", "FFF")])),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let Json(stats) = get_stats(State(state)).await.unwrap();
        assert_eq!(stats["tables"]["routes"], 3);
    }
}

//! GeoJSON rendering for shapes and stops
//!
//! Shapes are consolidated per route so overlapping track is drawn once;
//! stops become points annotated with the routes serving them.

pub mod consolidate;

pub use consolidate::{LatLon, ShapePoint, consolidate, consolidate_lines, group_shapes};

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue};

use crate::query::{Filters, QueryEngine};
use crate::{Result, Row, Value};

/// `[lat, lon]` vertices to an RFC 7946 `[lon, lat]` line string
fn line_string(line: &[LatLon]) -> Geometry {
    Geometry::new(geojson::Value::LineString(
        line.iter().map(|[lat, lon]| vec![*lon, *lat]).collect(),
    ))
}

fn feature(geometry: Option<Geometry>, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry,
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Consolidate shape rows into line features that all share `properties`
pub fn shapes_to_features(rows: &[Row], properties: &JsonObject) -> Vec<Feature> {
    let points = rows.iter().filter_map(ShapePoint::from_row).collect();
    consolidate(points)
        .iter()
        .map(|line| feature(Some(line_string(line)), properties.clone()))
        .collect()
}

fn stop_feature(mut stop: Row) -> Feature {
    let lat = stop.remove("stop_lat").and_then(|v| v.as_f64());
    let lon = stop.remove("stop_lon").and_then(|v| v.as_f64());
    let geometry = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Geometry::new(geojson::Value::Point(vec![lon, lat]))),
        _ => None,
    };
    feature(geometry, stop.into_json_object())
}

/// One point feature per stop; coordinates move into the geometry
pub fn stops_to_features(stops: Vec<Row>) -> Vec<Feature> {
    stops.into_iter().map(stop_feature).collect()
}

pub fn feature_collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Prefix a hex color with `#`; absent or empty colors stay as they are
fn hex_color(value: Option<&Value>) -> JsonValue {
    match value.and_then(Value::as_str) {
        Some(color) if !color.is_empty() => JsonValue::String(format!("#{color}")),
        _ => value.map(Value::to_json).unwrap_or(JsonValue::Null),
    }
}

fn agency_name(engine: &QueryEngine<'_>) -> Result<String> {
    let agencies = engine.get_agencies(&Filters::new())?;
    Ok(agencies
        .first()
        .and_then(|a| a.get_str("agency_name"))
        .unwrap_or_default()
        .to_string())
}

/// Consolidated shapes of every route matching `filters`, one pass per route.
///
/// `route_id` selects routes; the remaining filters (`trip_id`,
/// `service_id`, `direction_id`, ...) narrow each route's shapes.
pub fn shapes_as_geojson(engine: &QueryEngine<'_>, filters: &Filters) -> Result<FeatureCollection> {
    let agency_name = agency_name(engine)?;

    let mut route_filters = Filters::new();
    if let Some(route_id) = filters.get("route_id") {
        route_filters.insert("route_id".to_string(), route_id.clone());
    }

    let mut features = Vec::new();
    for route in engine.get_routes(&route_filters, &[])? {
        let Some(route_id) = route.get("route_id").cloned() else {
            continue;
        };

        let mut shape_filters = filters.clone();
        shape_filters.insert("route_id".to_string(), route_id);
        let shapes = engine.get_shapes(&shape_filters)?;
        if shapes.is_empty() {
            continue;
        }

        let route_color = hex_color(route.get("route_color"));
        let route_text_color = hex_color(route.get("route_text_color"));

        let mut properties = JsonObject::new();
        properties.insert("agency_name".to_string(), JsonValue::String(agency_name.clone()));
        properties.extend(route.into_json_object());
        properties.insert("route_color".to_string(), route_color);
        properties.insert("route_text_color".to_string(), route_text_color);

        features.extend(shapes_to_features(&shapes, &properties));
    }

    tracing::debug!(features = features.len(), "rendered shapes");
    Ok(feature_collection(features))
}

/// Numeric `route_short_name`; non-numeric names sort last
fn route_number(route: &Row) -> (bool, i64) {
    match route.get_str("route_short_name").and_then(|n| n.trim().parse::<i64>().ok()) {
        Some(n) => (false, n),
        None => (true, 0),
    }
}

/// Stops matching `filters` as points, each listing the routes that serve it
pub fn stops_as_geojson(engine: &QueryEngine<'_>, filters: &Filters) -> Result<FeatureCollection> {
    let agency_name = agency_name(engine)?;
    let stops = engine.get_stops(filters, &[])?;

    let mut features = Vec::with_capacity(stops.len());
    for stop in stops {
        let mut routes = match stop.get("stop_id") {
            Some(stop_id) => {
                let mut by_stop = Filters::new();
                by_stop.insert("stop_id".to_string(), stop_id.clone());
                engine.get_routes(&by_stop, &[])?
            }
            None => Vec::new(),
        };
        routes.sort_by_key(route_number);

        let mut feature = stop_feature(stop);
        if let Some(properties) = feature.properties.as_mut() {
            properties.insert("agency_name".to_string(), JsonValue::String(agency_name.clone()));
            properties.insert(
                "routes".to_string(),
                JsonValue::Array(routes.into_iter().map(|r| JsonValue::Object(r.into_json_object())).collect()),
            );
        }
        features.push(feature);
    }

    Ok(feature_collection(features))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::sample_store;

    fn filters(pairs: &[(&str, &str)]) -> Filters {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    fn coordinates(feature: &Feature) -> Vec<Vec<f64>> {
        match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::LineString(points)) => points.clone(),
            other => panic!("expected line string, got {other:?}"),
        }
    }

    #[test]
    fn test_shapes_per_route_with_route_properties() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);

        let collection = shapes_as_geojson(&engine, &filters(&[("route_id", "EXPRESS")])).unwrap();
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        // [lon, lat] order
        assert_eq!(coordinates(feature), vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![2.0, 0.0]]);

        let props = feature.properties.as_ref().unwrap();
        assert_eq!(props["agency_name"], "Caltrain");
        assert_eq!(props["route_id"], "EXPRESS");
        assert_eq!(props["route_color"], "#E31837");
        assert_eq!(props["route_text_color"], JsonValue::Null);
    }

    #[test]
    fn test_each_route_consolidates_its_own_shapes() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);

        // LOCAL draws SH2 on its own pass, so nothing of it is dropped
        let local = shapes_as_geojson(&engine, &filters(&[("route_id", "LOCAL")])).unwrap();
        assert_eq!(local.features.len(), 1);
        assert_eq!(coordinates(&local.features[0]).len(), 3);

        let all = shapes_as_geojson(&engine, &Filters::new()).unwrap();
        assert_eq!(all.features.len(), 2);
    }

    #[test]
    fn test_route_without_matching_shapes_has_no_features() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);

        assert!(shapes_as_geojson(&engine, &filters(&[("route_id", "SHUTTLE")])).unwrap().features.is_empty());
        assert!(shapes_as_geojson(&engine, &filters(&[("shape_id", "fake-shape-id")])).unwrap().features.is_empty());
        assert!(shapes_as_geojson(&engine, &filters(&[("route_id", "nope")])).unwrap().features.is_empty());
    }

    #[test]
    fn test_stops_carry_serving_routes() {
        let store = sample_store();
        let engine = QueryEngine::new(&store);

        let collection = stops_as_geojson(&engine, &filters(&[("stop_id", "S1")])).unwrap();
        assert_eq!(collection.features.len(), 1);

        let feature = &collection.features[0];
        match feature.geometry.as_ref().map(|g| &g.value) {
            Some(geojson::Value::Point(p)) => assert_eq!(p, &vec![-122.0, 37.0]),
            other => panic!("expected point, got {other:?}"),
        }

        let props = feature.properties.as_ref().unwrap();
        assert!(!props.contains_key("stop_lat"));
        assert!(!props.contains_key("stop_lon"));
        assert_eq!(props["agency_name"], "Caltrain");

        let routes: Vec<&str> = props["routes"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|r| r["route_id"].as_str())
            .collect();
        assert_eq!(routes, vec!["LOCAL", "EXPRESS"]);
    }

    #[test]
    fn test_unserved_stop_has_empty_routes() {
        let store = sample_store();
        let collection = stops_as_geojson(&QueryEngine::new(&store), &filters(&[("stop_id", "S5")])).unwrap();
        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["routes"], JsonValue::Array(Vec::new()));
    }

    #[test]
    fn test_stops_filtered_by_route() {
        let store = sample_store();
        let collection = stops_as_geojson(&QueryEngine::new(&store), &filters(&[("route_id", "SHUTTLE")])).unwrap();
        assert_eq!(collection.features.len(), 1);
        assert_eq!(collection.features[0].properties.as_ref().unwrap()["stop_id"], "S4");
    }
}

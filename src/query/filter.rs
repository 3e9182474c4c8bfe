//! Relational Filter Resolver
//!
//! Some entities accept filters that belong to a related entity's key
//! space: routes by `stop_id`, stops and shapes by trip attributes. Those
//! filters are resolved hop by hop through intermediate tables into a
//! nested `IN (SELECT ...)` restriction on the entity's own key, so only the
//! foreign filter values are ever bound, however many keys a hop yields.
//!
//! A hop that yields no keys ends resolution: the overall result is empty
//! and no further hops are queried.

use crate::Result;
use crate::query::builder::{BuiltQuery, Filters, SelectQuery};
use crate::storage::GtfsStore;

/// One lookup through an intermediate table
#[derive(Debug, Clone, Copy)]
pub struct Hop {
    pub table: &'static str,
    /// Column matched against the previous hop's keys; `None` for the first hop,
    /// which applies the foreign filters instead
    pub match_column: Option<&'static str>,
    /// Column collected as this hop's keys
    pub yields: &'static str,
}

/// How an entity's foreign filters reach its own key
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    pub entity: &'static str,
    pub foreign_keys: &'static [&'static str],
    pub hops: &'static [Hop],
    /// Own column restricted by the final hop's keys
    pub target: &'static str,
}

const TRIP_FILTERS: &[&str] = &["route_id", "trip_id", "service_id", "direction_id"];

pub static RELATIONS: &[Relation] = &[
    // stop_id -> stop_times.trip_id -> trips.route_id
    Relation {
        entity: "routes",
        foreign_keys: &["stop_id"],
        hops: &[
            Hop { table: "stop_times", match_column: None, yields: "trip_id" },
            Hop { table: "trips", match_column: Some("trip_id"), yields: "route_id" },
        ],
        target: "route_id",
    },
    // trip filters -> trips.trip_id -> stop_times.stop_id
    Relation {
        entity: "stops",
        foreign_keys: TRIP_FILTERS,
        hops: &[
            Hop { table: "trips", match_column: None, yields: "trip_id" },
            Hop { table: "stop_times", match_column: Some("trip_id"), yields: "stop_id" },
        ],
        target: "stop_id",
    },
    // trip filters -> trips.shape_id
    Relation {
        entity: "shapes",
        foreign_keys: TRIP_FILTERS,
        hops: &[Hop { table: "trips", match_column: None, yields: "shape_id" }],
        target: "shape_id",
    },
];

pub fn relation_for(entity: &str) -> Option<&'static Relation> {
    RELATIONS.iter().find(|r| r.entity == entity)
}

/// Filters ready to apply to the entity's own table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedFilters {
    pub own: Filters,
    /// Own key column and the subquery selecting its allowed values
    pub key_restriction: Option<(&'static str, BuiltQuery)>,
}

impl ResolvedFilters {
    pub fn apply(self, query: SelectQuery) -> SelectQuery {
        let query = query.filters(&self.own);
        match self.key_restriction {
            Some((column, keys)) => query.filter_in_select(column, keys),
            None => query,
        }
    }
}

/// Resolves related-entity filters against a store
pub struct FilterResolver<'a> {
    store: &'a GtfsStore,
}

impl<'a> FilterResolver<'a> {
    pub fn new(store: &'a GtfsStore) -> Self {
        Self { store }
    }

    /// Split `filters` into own and foreign filters and resolve the foreign ones.
    ///
    /// Returns `None` when some hop matched nothing, i.e. the query result is empty.
    pub fn resolve(&self, entity: &str, filters: &Filters) -> Result<Option<ResolvedFilters>> {
        let Some(relation) = relation_for(entity) else {
            return Ok(Some(ResolvedFilters {
                own: filters.clone(),
                key_restriction: None,
            }));
        };

        let (foreign, own): (Filters, Filters) = filters
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .partition(|(k, _)| relation.foreign_keys.contains(&k.as_str()));

        if foreign.is_empty() {
            return Ok(Some(ResolvedFilters { own, key_restriction: None }));
        }

        let mut keys: Option<BuiltQuery> = None;
        for hop in relation.hops {
            let query = SelectQuery::distinct_column(hop.table, hop.yields).filter_not_null(hop.yields);
            let query = match (hop.match_column, keys.take()) {
                (Some(column), Some(previous)) => query.filter_in_select(column, previous),
                _ => query.filters(&foreign),
            };
            let built = query.build();

            if !self.store.exists(&built)? {
                tracing::debug!(entity, hop = hop.table, "related filter matched nothing");
                return Ok(None);
            }
            keys = Some(built);
        }

        Ok(Some(ResolvedFilters {
            own,
            key_restriction: keys.map(|keys| (relation.target, keys)),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::test_support::sample_store;
    use crate::Value;

    fn restricted_keys(store: &GtfsStore, resolved: ResolvedFilters) -> (&'static str, Vec<Value>) {
        let (column, keys) = resolved.key_restriction.unwrap();
        let mut values = store.select_values(&keys).unwrap();
        values.sort_by(|a, b| a.as_str().cmp(&b.as_str()));
        (column, values)
    }

    fn filters(pairs: &[(&str, &str)]) -> Filters {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    #[test]
    fn test_entities_without_relation_pass_through() {
        let store = sample_store();
        let resolved = FilterResolver::new(&store)
            .resolve("agency", &filters(&[("agency_id", "CT")]))
            .unwrap()
            .unwrap();
        assert_eq!(resolved.own.len(), 1);
        assert!(resolved.key_restriction.is_none());
    }

    #[test]
    fn test_routes_by_stop_resolves_two_hops() {
        let store = sample_store();
        let resolved = FilterResolver::new(&store)
            .resolve("routes", &filters(&[("stop_id", "S3"), ("route_type", "2")]))
            .unwrap()
            .unwrap();

        assert_eq!(resolved.own, filters(&[("route_type", "2")]));
        let (column, keys) = restricted_keys(&store, resolved);
        assert_eq!(column, "route_id");
        assert_eq!(keys, vec![Value::from("LOCAL")]);
    }

    #[test]
    fn test_unknown_key_short_circuits_to_empty() {
        let store = sample_store();
        let resolver = FilterResolver::new(&store);
        assert!(resolver.resolve("routes", &filters(&[("stop_id", "nowhere")])).unwrap().is_none());
        assert!(resolver.resolve("stops", &filters(&[("route_id", "nope")])).unwrap().is_none());
        assert!(resolver.resolve("shapes", &filters(&[("trip_id", "nope")])).unwrap().is_none());
    }

    #[test]
    fn test_stops_by_trip_and_direction() {
        let store = sample_store();
        let resolved = FilterResolver::new(&store)
            .resolve("stops", &filters(&[("route_id", "EXPRESS"), ("direction_id", "0")]))
            .unwrap()
            .unwrap();

        let (column, keys) = restricted_keys(&store, resolved);
        assert_eq!(column, "stop_id");
        assert_eq!(keys, vec![Value::from("S1"), Value::from("S2")]);
    }

    #[test]
    fn test_shapes_skip_trips_without_shape() {
        let store = sample_store();
        // T3 has no shape_id, so nothing bridges to shapes
        assert!(FilterResolver::new(&store)
            .resolve("shapes", &filters(&[("trip_id", "T3")]))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_bound_parameters_do_not_grow_with_bridging_keys() {
        let mut store = GtfsStore::open_in_memory().unwrap();
        store.reset_all_tables().unwrap();

        // More trips than SQLite accepts as bound variables in one statement
        let trips: Vec<crate::Record> = (0..33_000)
            .map(|n| {
                [
                    ("trip_id", Value::from(format!("T{n}"))),
                    ("route_id", Value::from("R1")),
                    ("service_id", Value::from("WK")),
                ]
                .into_iter()
                .collect()
            })
            .collect();
        let entity = crate::schema::entity("trips").unwrap();
        for chunk in trips.chunks(500) {
            store.insert_records(entity, chunk).unwrap();
        }

        let stop_time: crate::Record = [
            ("trip_id", Value::from("T32999")),
            ("stop_id", Value::from("S1")),
            ("stop_sequence", Value::Integer(1)),
        ]
        .into_iter()
        .collect();
        store.insert_records(crate::schema::entity("stop_times").unwrap(), &[stop_time]).unwrap();

        let stops: Vec<crate::Record> = ["S1", "S2"]
            .into_iter()
            .map(|id| [("stop_id", Value::from(id)), ("stop_name", Value::from(id))].into_iter().collect())
            .collect();
        store.insert_records(crate::schema::entity("stops").unwrap(), &stops).unwrap();

        let resolved = FilterResolver::new(&store)
            .resolve("stops", &filters(&[("service_id", "WK")]))
            .unwrap()
            .unwrap();
        let (_, keys) = resolved.key_restriction.as_ref().unwrap();
        assert_eq!(keys.params, vec![Value::from("WK")]);

        let rows = crate::QueryEngine::new(&store)
            .get_stops(&filters(&[("service_id", "WK")]), &[])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_str("stop_id"), Some("S1"));
    }
}

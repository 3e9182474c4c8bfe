//! Query engine implementation
//!
//! The retrieval interface every entity shares:
//! `query(filters, columns, order_by) -> rows`. Related-entity filters are
//! resolved first for the entities that support them (see [`super::filter`]).

use crate::query::builder::{Filters, SelectQuery};
use crate::query::filter::FilterResolver;
use crate::query::OrderDirection;
use crate::schema;
use crate::storage::GtfsStore;
use crate::{Error, Result, Row};

/// Query engine over a loaded feed
pub struct QueryEngine<'a> {
    store: &'a GtfsStore,
}

impl<'a> QueryEngine<'a> {
    /// Create a new query engine
    pub fn new(store: &'a GtfsStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'a GtfsStore {
        self.store
    }

    /// Rows of `entity` matching `filters`, projected to `columns` and sorted by `order_by`.
    ///
    /// Filters that no row satisfies, directly or through a related entity,
    /// yield an empty list rather than an error.
    pub fn query(
        &self,
        entity: &str,
        filters: &Filters,
        columns: &[String],
        order_by: &[(String, OrderDirection)],
    ) -> Result<Vec<Row>> {
        let schema = schema::entity(entity).ok_or_else(|| Error::UnknownEntity(entity.to_string()))?;

        let Some(resolved) = FilterResolver::new(self.store).resolve(schema.name, filters)? else {
            return Ok(Vec::new());
        };

        let query = resolved
            .apply(SelectQuery::new(schema.name).columns(columns.iter().cloned()))
            .order_by(order_by)
            .build();

        self.store.select(&query)
    }

    /// All rows of `entity` matching `filters`, unordered
    pub fn find(&self, entity: &str, filters: &Filters) -> Result<Vec<Row>> {
        self.query(entity, filters, &[], &[])
    }

    pub fn get_agencies(&self, filters: &Filters) -> Result<Vec<Row>> {
        self.find("agency", filters)
    }

    /// Routes; accepts `stop_id` to find the routes serving a stop
    pub fn get_routes(&self, filters: &Filters, order_by: &[(String, OrderDirection)]) -> Result<Vec<Row>> {
        self.query("routes", filters, &[], order_by)
    }

    /// Stops; accepts `route_id`, `trip_id`, `service_id` and `direction_id`
    pub fn get_stops(&self, filters: &Filters, order_by: &[(String, OrderDirection)]) -> Result<Vec<Row>> {
        self.query("stops", filters, &[], order_by)
    }

    /// Shape points; accepts `route_id`, `trip_id`, `service_id` and `direction_id`
    pub fn get_shapes(&self, filters: &Filters) -> Result<Vec<Row>> {
        self.find("shapes", filters)
    }

    pub fn get_trips(&self, filters: &Filters) -> Result<Vec<Row>> {
        self.find("trips", filters)
    }

    pub fn get_stop_times(&self, filters: &Filters, order_by: &[(String, OrderDirection)]) -> Result<Vec<Row>> {
        self.query("stop_times", filters, &[], order_by)
    }
}

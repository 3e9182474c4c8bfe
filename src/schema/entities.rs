//! Entity definitions, one per GTFS file

use super::{Column, EntitySchema};

const AGENCY: &[Column] = &[
    Column::synthetic_id(),
    Column::text("agency_id"),
    Column::text("agency_name").required(),
    Column::text("agency_url").required(),
    Column::text("agency_timezone").required(),
    Column::text("agency_lang"),
    Column::text("agency_phone"),
    Column::text("agency_fare_url"),
    Column::text("agency_email"),
];

const ATTRIBUTIONS: &[Column] = &[
    Column::synthetic_id(),
    Column::text("attribution_id"),
    Column::text("agency_id"),
    Column::text("route_id"),
    Column::text("trip_id"),
    Column::text("organization_name").required(),
    Column::integer("is_producer").range(0.0, 1.0),
    Column::integer("is_operator").range(0.0, 1.0),
    Column::integer("is_authority").range(0.0, 1.0),
    Column::text("attribution_url"),
    Column::text("attribution_email"),
    Column::text("attribution_phone"),
];

const CALENDAR_DATES: &[Column] = &[
    Column::synthetic_id(),
    Column::text("service_id").required(),
    Column::integer("date").required(),
    Column::integer("exception_type").required().range(1.0, 2.0),
    Column::text("holiday_name"),
];

const CALENDAR: &[Column] = &[
    Column::text("service_id").primary(),
    Column::integer("monday").required().range(0.0, 1.0),
    Column::integer("tuesday").required().range(0.0, 1.0),
    Column::integer("wednesday").required().range(0.0, 1.0),
    Column::integer("thursday").required().range(0.0, 1.0),
    Column::integer("friday").required().range(0.0, 1.0),
    Column::integer("saturday").required().range(0.0, 1.0),
    Column::integer("sunday").required().range(0.0, 1.0),
    Column::integer("start_date").required(),
    Column::integer("end_date").required(),
];

const FARE_ATTRIBUTES: &[Column] = &[
    Column::text("fare_id").primary(),
    Column::real("price").required().min(0.0),
    Column::text("currency_type").required(),
    Column::integer("payment_method").required().range(0.0, 1.0),
    Column::integer("transfers").range(0.0, 2.0),
    Column::text("agency_id"),
    Column::integer("transfer_duration").min(0.0),
];

const FARE_RULES: &[Column] = &[
    Column::synthetic_id(),
    Column::text("fare_id").required(),
    Column::text("route_id"),
    Column::text("origin_id"),
    Column::text("destination_id"),
    Column::text("contains_id"),
];

const FEED_INFO: &[Column] = &[
    Column::synthetic_id(),
    Column::text("feed_publisher_name").required(),
    Column::text("feed_publisher_url").required(),
    Column::text("feed_lang").required(),
    Column::text("default_lang"),
    Column::integer("feed_start_date"),
    Column::integer("feed_end_date"),
    Column::text("feed_version"),
    Column::text("feed_contact_email"),
    Column::text("feed_contact_url"),
];

const FREQUENCIES: &[Column] = &[
    Column::synthetic_id(),
    Column::text("trip_id").required(),
    Column::text("start_time").required(),
    Column::timestamp("start_timestamp", "start_time"),
    Column::text("end_time").required(),
    Column::timestamp("end_timestamp", "end_time"),
    Column::integer("headway_secs").required().min(0.0),
    Column::integer("exact_times").range(0.0, 1.0),
];

const LEVELS: &[Column] = &[
    Column::text("level_id").primary(),
    Column::real("level_index").required(),
    Column::text("level_name"),
];

const PATHWAYS: &[Column] = &[
    Column::text("pathway_id").primary(),
    Column::text("from_stop_id").required(),
    Column::text("to_stop_id").required(),
    Column::integer("pathway_mode").required().range(1.0, 7.0),
    Column::integer("is_bidirectional").required().range(0.0, 1.0),
    Column::real("length").min(0.0),
    Column::integer("traversal_time").min(0.0),
    Column::integer("stair_count"),
    Column::real("max_slope"),
    Column::real("min_width").min(0.0),
    Column::text("signposted_as"),
    Column::text("reversed_signposted_as"),
];

const ROUTES: &[Column] = &[
    Column::text("route_id").primary(),
    Column::text("agency_id"),
    Column::text("route_short_name"),
    Column::text("route_long_name"),
    Column::text("route_desc"),
    Column::integer("route_type").required().min(0.0),
    Column::text("route_url"),
    Column::text("route_color"),
    Column::text("route_text_color"),
    Column::integer("route_sort_order").min(0.0),
    Column::integer("continuous_pickup").range(0.0, 3.0),
    Column::integer("continuous_drop_off").range(0.0, 3.0),
];

const SHAPES: &[Column] = &[
    Column::synthetic_id(),
    Column::text("shape_id").required(),
    Column::latitude("shape_pt_lat").required(),
    Column::longitude("shape_pt_lon").required(),
    Column::integer("shape_pt_sequence").required().min(0.0),
    Column::real("shape_dist_traveled").min(0.0),
];

const STOP_TIMES: &[Column] = &[
    Column::synthetic_id(),
    Column::text("trip_id").required(),
    Column::text("arrival_time"),
    Column::timestamp("arrival_timestamp", "arrival_time"),
    Column::text("departure_time"),
    Column::timestamp("departure_timestamp", "departure_time"),
    Column::text("stop_id").required(),
    Column::integer("stop_sequence").required().min(0.0),
    Column::text("stop_headsign"),
    Column::integer("pickup_type").range(0.0, 3.0),
    Column::integer("drop_off_type").range(0.0, 3.0),
    Column::integer("continuous_pickup").range(0.0, 3.0),
    Column::integer("continuous_drop_off").range(0.0, 3.0),
    Column::real("shape_dist_traveled").min(0.0),
    Column::integer("timepoint").range(0.0, 1.0),
];

const STOPS: &[Column] = &[
    Column::text("stop_id").primary(),
    Column::text("stop_code"),
    Column::text("stop_name"),
    Column::text("stop_desc"),
    Column::latitude("stop_lat"),
    Column::longitude("stop_lon"),
    Column::text("zone_id"),
    Column::text("stop_url"),
    Column::integer("location_type").range(0.0, 4.0),
    Column::text("parent_station"),
    Column::text("stop_timezone"),
    Column::integer("wheelchair_boarding").range(0.0, 2.0),
    Column::text("level_id"),
    Column::text("platform_code"),
];

const TRANSFERS: &[Column] = &[
    Column::synthetic_id(),
    Column::text("from_stop_id").required(),
    Column::text("to_stop_id").required(),
    Column::integer("transfer_type").required().range(0.0, 3.0),
    Column::integer("min_transfer_time").min(0.0),
];

const TRANSLATIONS: &[Column] = &[
    Column::synthetic_id(),
    Column::text("table_name").required(),
    Column::text("field_name").required(),
    Column::text("language").required(),
    Column::text("translation").required(),
    Column::text("record_id"),
    Column::text("record_sub_id"),
    Column::text("field_value"),
];

const TRIPS: &[Column] = &[
    Column::text("trip_id").primary(),
    Column::text("route_id").required(),
    Column::text("service_id").required(),
    Column::text("trip_headsign"),
    Column::text("trip_short_name"),
    Column::integer("direction_id").range(0.0, 1.0),
    Column::text("block_id"),
    Column::text("shape_id"),
    Column::integer("wheelchair_accessible").range(0.0, 2.0),
    Column::integer("bikes_allowed").range(0.0, 2.0),
];

const STOP_ATTRIBUTES: &[Column] = &[
    Column::synthetic_id(),
    Column::text("stop_id").required(),
    Column::text("stop_city"),
];

const TIMETABLES: &[Column] = &[
    Column::synthetic_id(),
    Column::text("timetable_id"),
    Column::text("route_id"),
    Column::integer("direction_id").range(0.0, 1.0),
    Column::integer("start_date"),
    Column::integer("end_date"),
    Column::integer("monday").range(0.0, 1.0),
    Column::integer("tuesday").range(0.0, 1.0),
    Column::integer("wednesday").range(0.0, 1.0),
    Column::integer("thursday").range(0.0, 1.0),
    Column::integer("friday").range(0.0, 1.0),
    Column::integer("saturday").range(0.0, 1.0),
    Column::integer("sunday").range(0.0, 1.0),
    Column::text("start_time"),
    Column::timestamp("start_timestamp", "start_time"),
    Column::text("end_time"),
    Column::timestamp("end_timestamp", "end_time"),
    Column::text("timetable_label"),
    Column::text("service_notes"),
    Column::text("orientation").default_text("vertical"),
    Column::text("timetable_page_id"),
    Column::integer("timetable_sequence").min(0.0),
    Column::text("direction_name"),
    Column::integer("include_exceptions").range(0.0, 1.0).default_integer(0),
    Column::integer("show_trip_continuation").range(0.0, 1.0).default_integer(0),
];

const TIMETABLE_PAGES: &[Column] = &[
    Column::text("timetable_page_id").primary(),
    Column::text("timetable_page_label"),
    Column::text("filename"),
];

const TIMETABLE_STOP_ORDER: &[Column] = &[
    Column::synthetic_id(),
    Column::text("timetable_id"),
    Column::text("stop_id"),
    Column::integer("stop_sequence").min(0.0),
];

const fn standard(name: &'static str, columns: &'static [Column]) -> EntitySchema {
    EntitySchema { name, columns, nonstandard: false }
}

const fn nonstandard(name: &'static str, columns: &'static [Column]) -> EntitySchema {
    EntitySchema { name, columns, nonstandard: true }
}

/// Every entity in load (and export) order
pub static ENTITIES: &[EntitySchema] = &[
    standard("agency", AGENCY),
    standard("attributions", ATTRIBUTIONS),
    standard("calendar_dates", CALENDAR_DATES),
    standard("calendar", CALENDAR),
    standard("fare_attributes", FARE_ATTRIBUTES),
    standard("fare_rules", FARE_RULES),
    standard("feed_info", FEED_INFO),
    standard("frequencies", FREQUENCIES),
    standard("levels", LEVELS),
    standard("pathways", PATHWAYS),
    standard("routes", ROUTES),
    standard("shapes", SHAPES),
    standard("stop_times", STOP_TIMES),
    standard("stops", STOPS),
    standard("transfers", TRANSFERS),
    standard("translations", TRANSLATIONS),
    standard("trips", TRIPS),
    nonstandard("stop_attributes", STOP_ATTRIBUTES),
    nonstandard("timetables", TIMETABLES),
    nonstandard("timetable_pages", TIMETABLE_PAGES),
    nonstandard("timetable_stop_order", TIMETABLE_STOP_ORDER),
];

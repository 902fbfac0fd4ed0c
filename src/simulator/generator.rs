use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::dataset::SupplyRow;
use crate::classify::Status;

static ENTITIES: &[&str] = &["warehouse", "store", "factory"];

static LOCATIONS: &[&str] = &["Delhi", "Mumbai", "Bangalore", "New York", "London"];

static BASIC_STATUSES: &[Status] = &[Status::Normal, Status::Warning, Status::Critical];

/// Site names used when no dataset is configured.
static SITES: &[&str] = &[
    "Mumbai Retail Store",
    "Kolkata Store",
    "Jaipur Showroom Store",
    "Delhi Distribution Center",
    "Chennai Warehouse",
    "Pune Logistics Center",
    "Bangalore Tech Hub",
];

pub static EXTERNAL_EVENTS: &[&str] = &[
    "Fuel hike",
    "Port congestion",
    "Festival demand spike",
    "Political unrest",
    "Monsoon delay",
    "Raw material shortage",
];

pub const FESTIVAL_DEMAND_SPIKE: &str = "Festival demand spike";

pub const FUEL_PRICE_START: f64 = 100.0;
pub const FUEL_PRICE_MIN: f64 = 50.0;
pub const FUEL_PRICE_MAX: f64 = 200.0;

/// Body posted to the ingestion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    pub entity: String,
    pub location: String,
    pub inventory_level: i64,
    pub status: Status,
    pub timestamp: String,
}

/// A generated event and the conditions that produced it. Only `payload` is sent.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// `Live` or `Scenario-N`.
    pub universe: String,
    pub reason: Option<&'static str>,
    pub external_event: Option<&'static str>,
    pub fuel_price: f64,
    pub payload: EventPayload,
}

pub fn wire_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// `store` when the location names a store, otherwise `warehouse`.
pub fn entity_for_location(location: &str) -> &'static str {
    if location.to_lowercase().contains("store") {
        "store"
    } else {
        "warehouse"
    }
}

/// Uniform random event, independent of any dataset.
pub fn basic_event<R: Rng>(rng: &mut R, now: DateTime<Utc>) -> EventPayload {
    EventPayload {
        entity: ENTITIES.choose(rng).unwrap_or(&"warehouse").to_string(),
        location: LOCATIONS.choose(rng).unwrap_or(&"Delhi").to_string(),
        inventory_level: rng.gen_range(100..=800),
        status: *BASIC_STATUSES.choose(rng).unwrap_or(&Status::Normal),
        timestamp: wire_timestamp(now),
    }
}

/// Status and reason for a row under the given fuel price and external event.
/// Rules are checked in order; the first match wins.
pub fn assess(row: &SupplyRow, fuel_price: f64, event: Option<&str>) -> (Status, Option<&'static str>) {
    if row.stock_levels < 20 || row.availability < 20 {
        return (Status::Critical, Some("Low stock"));
    }
    if row.defect_rates > 3.0 {
        return (Status::Warning, Some("High defect rate"));
    }
    if row.lead_times > 20 || row.manufacturing_lead_time.unwrap_or(0) > 20 {
        return (Status::Warning, Some("Long lead time"));
    }
    if fuel_price > 150.0 {
        return (Status::Warning, Some("High fuel price"));
    }
    if event == Some(FESTIVAL_DEMAND_SPIKE) && row.stock_levels < 50 {
        return (Status::Critical, Some("Insufficient stock for festival"));
    }
    (Status::Normal, None)
}

/// Random walk of ±3, kept inside the fuel price band.
pub fn drift_fuel<R: Rng>(rng: &mut R, fuel_price: f64) -> f64 {
    (fuel_price + rng.gen_range(-3.0..=3.0)).clamp(FUEL_PRICE_MIN, FUEL_PRICE_MAX)
}

pub fn pick_event<R: Rng>(rng: &mut R, probability: f64) -> Option<&'static str> {
    if rng.gen_bool(probability) {
        EXTERNAL_EVENTS.choose(rng).copied()
    } else {
        None
    }
}

fn scenario(
    universe: String,
    row: &SupplyRow,
    fuel_price: f64,
    external_event: Option<&'static str>,
    now: DateTime<Utc>,
) -> Scenario {
    let (status, reason) = assess(row, fuel_price, external_event);
    Scenario {
        universe,
        reason,
        external_event,
        fuel_price: (fuel_price * 100.0).round() / 100.0,
        payload: EventPayload {
            entity: entity_for_location(&row.location).to_string(),
            location: row.location.clone(),
            inventory_level: row.stock_levels,
            status,
            timestamp: wire_timestamp(now),
        },
    }
}

pub fn live_event(
    row: &SupplyRow,
    fuel_price: f64,
    external_event: Option<&'static str>,
    now: DateTime<Utc>,
) -> Scenario {
    scenario("Live".to_string(), row, fuel_price, external_event, now)
}

/// `count` what-if variants of `row`: perturbed fuel, stock, defects and lead time.
pub fn scenario_variants<R: Rng>(
    rng: &mut R,
    row: &SupplyRow,
    base_fuel: f64,
    count: usize,
    now: DateTime<Utc>,
) -> Vec<Scenario> {
    let mut out = Vec::with_capacity(count);

    for i in 1..=count {
        let fuel_price = base_fuel + rng.gen_range(-10.0..=10.0);
        let event = pick_event(&mut *rng, 0.4);

        let mut variant = row.clone();
        variant.stock_levels = (variant.stock_levels + rng.gen_range(-10..=10)).max(0);
        variant.defect_rates = (variant.defect_rates + rng.gen_range(-1.0..=1.0)).max(0.0);
        variant.lead_times = (variant.lead_times + rng.gen_range(-3..=3)).max(0);

        out.push(scenario(format!("Scenario-{i}"), &variant, fuel_price, event, now));
    }

    out
}

/// A plausible dataset row for runs without a CSV file.
pub fn synthetic_row<R: Rng>(rng: &mut R, serial: usize) -> SupplyRow {
    SupplyRow {
        sku: format!("SKU{serial}"),
        location: SITES.choose(rng).unwrap_or(&"Chennai Warehouse").to_string(),
        stock_levels: rng.gen_range(0..=100),
        availability: rng.gen_range(0..=100),
        defect_rates: rng.gen_range(0.0..5.0),
        lead_times: rng.gen_range(1..=30),
        manufacturing_lead_time: Some(rng.gen_range(1..=30)),
    }
}

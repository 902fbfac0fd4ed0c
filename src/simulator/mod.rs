//! Synthetic event driver for the ingestion API.
//!
//! Runs on a fixed interval. Each tick produces one event (basic mode) or a
//! live event plus what-if variants (scenario mode) and posts them one by one.
//! Submissions are fire-and-forget: failures are logged and never retried.

pub mod client;
pub mod dataset;
pub mod generator;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::{SimulatorConfig, SimulatorMode};
use client::IngestClient;
use dataset::SupplyRow;
use generator::Scenario;

/// Per-tick submission counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Accepted with 201.
    pub sent: usize,
    /// Reached the server but were not accepted.
    pub rejected: usize,
    /// Never got a response.
    pub failed: usize,
}

pub struct Simulator {
    config: SimulatorConfig,
    client: IngestClient,
    // StdRng is Send, so the simulator can be held across await points
    rng: StdRng,
    rows: Vec<SupplyRow>,
    fuel_price: f64,
    serial: usize,
}

impl Simulator {
    pub fn new(config: SimulatorConfig) -> anyhow::Result<Self> {
        let rows = match &config.dataset {
            Some(path) => {
                let rows = dataset::load(path)?;
                info!(rows = rows.len(), path = %path.display(), "Loaded simulator dataset");
                rows
            }
            None => Vec::new(),
        };
        let client = IngestClient::new(config.backend_url.clone())?;
        Ok(Self::with_parts(config, client, rows, StdRng::from_entropy()))
    }

    /// Assemble a simulator from explicit parts; an empty `rows` means synthetic rows.
    pub fn with_parts(config: SimulatorConfig, client: IngestClient, rows: Vec<SupplyRow>, rng: StdRng) -> Self {
        Self {
            config,
            client,
            rng,
            rows,
            fuel_price: generator::FUEL_PRICE_START,
            serial: 0,
        }
    }

    pub fn fuel_price(&self) -> f64 {
        self.fuel_price
    }

    fn next_row(&mut self) -> SupplyRow {
        self.serial += 1;
        match self.rows.choose(&mut self.rng) {
            Some(row) => row.clone(),
            None => generator::synthetic_row(&mut self.rng, self.serial),
        }
    }

    /// Events for one tick, without sending them.
    pub fn next_batch(&mut self, now: DateTime<Utc>) -> Vec<Scenario> {
        match self.config.mode {
            SimulatorMode::Basic => {
                let payload = generator::basic_event(&mut self.rng, now);
                vec![Scenario {
                    universe: "Live".to_string(),
                    reason: None,
                    external_event: None,
                    fuel_price: self.fuel_price,
                    payload,
                }]
            }
            SimulatorMode::Scenario => {
                let row = self.next_row();
                self.fuel_price = generator::drift_fuel(&mut self.rng, self.fuel_price);
                let event = generator::pick_event(&mut self.rng, 0.2);

                let mut batch = vec![generator::live_event(&row, self.fuel_price, event, now)];
                batch.extend(generator::scenario_variants(
                    &mut self.rng,
                    &row,
                    self.fuel_price,
                    self.config.scenarios,
                    now,
                ));
                batch
            }
        }
    }

    /// Generate and post one tick's events.
    pub async fn tick(&mut self) -> TickReport {
        let batch = self.next_batch(Utc::now());
        let mut report = TickReport::default();

        for scenario in &batch {
            let payload = &scenario.payload;
            match self.client.submit(payload).await {
                Ok(outcome) if outcome.is_success() => {
                    report.sent += 1;
                    info!(
                        universe = %scenario.universe,
                        entity = %payload.entity,
                        location = %payload.location,
                        inventory_level = payload.inventory_level,
                        status = %payload.status,
                        reason = scenario.reason.unwrap_or("N/A"),
                        external_event = scenario.external_event.unwrap_or("none"),
                        fuel_price = scenario.fuel_price,
                        http_status = outcome.status.as_u16(),
                        "Event sent"
                    );
                }
                Ok(outcome) => {
                    report.rejected += 1;
                    warn!(
                        universe = %scenario.universe,
                        http_status = outcome.status.as_u16(),
                        message = outcome.message(),
                        "Event rejected"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(universe = %scenario.universe, error = %format!("{e:#}"), "Error sending event");
                }
            }
        }

        report
    }

    /// Tick until `max_ticks` is reached or Ctrl-C arrives.
    pub async fn run(mut self) -> anyhow::Result<()> {
        info!(
            url = self.client.url(),
            mode = ?self.config.mode,
            interval_secs = self.config.interval.as_secs(),
            "Simulator started"
        );

        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    info!("Simulator interrupted");
                    break;
                }
            }

            let report = self.tick().await;
            ticks += 1;
            debug!(
                tick = ticks,
                sent = report.sent,
                rejected = report.rejected,
                failed = report.failed,
                "Tick complete"
            );

            if self.config.max_ticks.is_some_and(|max| ticks >= max) {
                info!(ticks, "Reached SIMULATOR_MAX_TICKS");
                break;
            }
        }

        Ok(())
    }
}

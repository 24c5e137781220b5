use anyhow::Result;
use std::f64::consts::TAU;
use std::time::Duration;

use crate::{Reading, TelemetrySource};

/// Bench telemetry for running the dashboard without the car.
/// Battery swings 10..90 % over a minute, current 500..1700 mA over 30 s.
#[derive(Debug, Clone)]
pub struct Waveform {
    step: Duration,
    elapsed: Duration,
}

const BATTERY_PERIOD_S: f64 = 60.0;
const CURRENT_PERIOD_S: f64 = 30.0;

impl Waveform {
    pub fn new(step: Duration) -> Self {
        Self { step, elapsed: Duration::ZERO }
    }

    fn sample_at(t: f64) -> Reading {
        let battery = 50.0 + 40.0 * (TAU * (t % BATTERY_PERIOD_S) / BATTERY_PERIOD_S).sin();
        let current = 500.0 + 1200.0 * (TAU * (t % CURRENT_PERIOD_S) / CURRENT_PERIOD_S).sin().abs();
        Reading { battery_percent: Some(battery), charging_current_ma: Some(current) }
    }
}

impl TelemetrySource for Waveform {
    fn poll(&mut self) -> Result<Reading> {
        let r = Self::sample_at(self.elapsed.as_secs_f64());
        self.elapsed += self.step;
        Ok(r)
    }

    fn describe(&self) -> String {
        format!("waveform (step {:?})", self.step)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scenario {
    pub current_ma: f64,
    pub ticks: u32,
}

pub fn default_scenarios() -> Vec<Scenario> {
    [(500.0, 5), (1500.0, 5), (800.0, 3), (2000.0, 3), (200.0, 3), (1200.0, 5)]
        .into_iter()
        .map(|(current_ma, ticks)| Scenario { current_ma, ticks })
        .collect()
}

/// Steps through charging currents on either side of the dashboard's
/// 1000 mA charging-icon threshold while the battery creeps up 5 % per scenario.
#[derive(Debug, Clone)]
pub struct ChargingScenarios {
    scenarios: Vec<Scenario>,
    index: usize,
    tick_in_scenario: u32,
    battery: f64,
}

const START_BATTERY: f64 = 25.0;
const BATTERY_STEP: f64 = 5.0;

impl ChargingScenarios {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios, index: 0, tick_in_scenario: 0, battery: START_BATTERY }
    }

    pub fn current(&self) -> Option<&Scenario> {
        if self.scenarios.is_empty() {
            return None;
        }
        self.scenarios.get(self.index % self.scenarios.len())
    }

    fn advance(&mut self) {
        self.index += 1;
        self.tick_in_scenario = 0;
        self.battery = (self.battery + BATTERY_STEP).min(100.0);
        if self.battery >= 100.0 {
            self.battery = START_BATTERY;
        }
    }
}

impl Default for ChargingScenarios {
    fn default() -> Self {
        Self::new(default_scenarios())
    }
}

impl TelemetrySource for ChargingScenarios {
    fn poll(&mut self) -> Result<Reading> {
        let Some(sc) = self.current().copied() else {
            anyhow::bail!("no charging scenarios configured");
        };
        let r = Reading { battery_percent: Some(self.battery), charging_current_ma: Some(sc.current_ma) };
        self.tick_in_scenario += 1;
        if self.tick_in_scenario >= sc.ticks.max(1) {
            self.advance();
        }
        Ok(r)
    }

    fn describe(&self) -> String {
        format!("charging scenarios ({} steps)", self.scenarios.len())
    }
}

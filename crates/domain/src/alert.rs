//! Alert rules
//!
//! A rule is a (type, severity, predicate) triple. The rule set is
//! process-wide constant; there is no runtime registration.

use crate::telemetry::TelemetryMessage;

/// Alert classification, persisted and used in dedup keys as its string form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertType {
    Speeding,
    LowFuel,
    EngineOverheat,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Speeding => "SPEEDING",
            AlertType::LowFuel => "LOW_FUEL",
            AlertType::EngineOverheat => "ENGINE_OVERHEAT",
        }
    }

    /// The sensor reading that triggered an alert of this type.
    pub fn trigger_value(&self, msg: &TelemetryMessage) -> f64 {
        match self {
            AlertType::Speeding => msg.speed_kmh,
            AlertType::LowFuel => msg.fuel_pct,
            AlertType::EngineOverheat => msg.engine_temp_c,
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Info => "INFO",
            AlertSeverity::Warning => "WARNING",
            AlertSeverity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A threshold rule evaluated against every reading on the alert path
#[derive(Debug, Clone, Copy)]
pub struct AlertRule {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    predicate: fn(&TelemetryMessage) -> bool,
}

impl AlertRule {
    #[inline]
    pub fn matches(&self, msg: &TelemetryMessage) -> bool {
        (self.predicate)(msg)
    }
}

/// The built-in rule set.
pub const DEFAULT_RULES: &[AlertRule] = &[
    AlertRule {
        alert_type: AlertType::Speeding,
        severity: AlertSeverity::Warning,
        predicate: |m| m.speed_kmh > 100.0,
    },
    AlertRule {
        alert_type: AlertType::LowFuel,
        severity: AlertSeverity::Warning,
        predicate: |m| m.fuel_pct < 10.0,
    },
    AlertRule {
        alert_type: AlertType::EngineOverheat,
        severity: AlertSeverity::Critical,
        predicate: |m| m.engine_temp_c > 100.0,
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message() -> TelemetryMessage {
        TelemetryMessage {
            received_at: Utc::now(),
            timestamp: Utc::now(),
            vehicle_id: "veh-1".into(),
            fleet_id: "fleet-a".into(),
            latitude: 0.0,
            longitude: 0.0,
            speed_kmh: 50.0,
            fuel_pct: 60.0,
            engine_temp_c: 85.0,
            battery_voltage: 12.5,
            odometer_km: 1000.0,
            is_moving: true,
            engine_on: true,
            raw_payload: Vec::new(),
        }
    }

    fn rule(alert_type: AlertType) -> &'static AlertRule {
        DEFAULT_RULES
            .iter()
            .find(|r| r.alert_type == alert_type)
            .unwrap()
    }

    #[test]
    fn speeding_fires_above_threshold() {
        let mut msg = message();
        assert!(!rule(AlertType::Speeding).matches(&msg));

        msg.speed_kmh = 100.0;
        assert!(!rule(AlertType::Speeding).matches(&msg));

        msg.speed_kmh = 100.1;
        assert!(rule(AlertType::Speeding).matches(&msg));
    }

    #[test]
    fn low_fuel_fires_below_threshold() {
        let mut msg = message();
        msg.fuel_pct = 10.0;
        assert!(!rule(AlertType::LowFuel).matches(&msg));

        msg.fuel_pct = 9.9;
        assert!(rule(AlertType::LowFuel).matches(&msg));
    }

    #[test]
    fn overheat_fires_above_threshold() {
        let mut msg = message();
        msg.engine_temp_c = 100.0;
        assert!(!rule(AlertType::EngineOverheat).matches(&msg));

        msg.engine_temp_c = 100.5;
        assert!(rule(AlertType::EngineOverheat).matches(&msg));
    }

    #[test]
    fn trigger_values_come_from_matching_sensor() {
        let mut msg = message();
        msg.speed_kmh = 150.0;
        msg.fuel_pct = 5.0;
        msg.engine_temp_c = 110.0;

        assert_eq!(AlertType::Speeding.trigger_value(&msg), 150.0);
        assert_eq!(AlertType::LowFuel.trigger_value(&msg), 5.0);
        assert_eq!(AlertType::EngineOverheat.trigger_value(&msg), 110.0);
    }

    #[test]
    fn string_forms_are_stable() {
        assert_eq!(AlertType::Speeding.as_str(), "SPEEDING");
        assert_eq!(AlertType::LowFuel.as_str(), "LOW_FUEL");
        assert_eq!(AlertType::EngineOverheat.as_str(), "ENGINE_OVERHEAT");
        assert_eq!(AlertSeverity::Critical.as_str(), "CRITICAL");
        assert_eq!(AlertType::Speeding.to_string(), "SPEEDING");
    }
}

//! Builds sample vectors out of live sensor readings.

/// Readings older than this many seconds are considered stale.
pub const FRESH_SECS: f64 = 10.0;

/// The distance reported for stale or missing sensors, and the cap for every distance.
pub const MAX_DISTANCE: f64 = 10.0;

/// The latest reading received from a single sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub sensor: String,
    pub distance: f64,
    /// Seconds elapsed since the reading was taken.
    pub age_secs: f64,
}

impl SensorReading {
    pub fn new(sensor: impl Into<String>, distance: f64, age_secs: f64) -> Self {
        Self {
            sensor: sensor.into(),
            distance,
            age_secs,
        }
    }

    fn encode(&self) -> [f64; 2] {
        let fresh = if self.age_secs < FRESH_SECS { 1.0 } else { 0.0 };
        let value = if self.age_secs > FRESH_SECS {
            MAX_DISTANCE
        } else {
            self.distance.min(MAX_DISTANCE)
        };

        [value, fresh]
    }
}

/// Lays out the readings as `[distance, fresh, distance, fresh, ...]` following
/// `sensor_order`. Sensors without a reading contribute `[MAX_DISTANCE, 0.0]`.
pub fn encode_readings(sensor_order: &[String], readings: &[SensorReading]) -> Vec<f64> {
    sensor_order
        .iter()
        .flat_map(|sensor| {
            readings
                .iter()
                .find(|reading| &reading.sensor == sensor)
                .map_or([MAX_DISTANCE, 0.0], SensorReading::encode)
        })
        .collect()
}

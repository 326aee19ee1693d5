use serde::{Deserialize, Serialize};

use crate::BoxError;

/// One humidity/temperature sample. NaN in either field marks a sensor fault;
/// a faulty reading is dropped for the rest of the cycle, never published.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct Reading {
    pub humidity_percent: f32,
    pub temperature_celsius: f32,
}

impl Reading {
    pub fn new(humidity_percent: f32, temperature_celsius: f32) -> Self {
        Self {
            humidity_percent,
            temperature_celsius,
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.humidity_percent.is_nan() && !self.temperature_celsius.is_nan()
    }

    /// Humidity as the decimal string published to the broker.
    pub fn humidity_payload(&self) -> String {
        format!("{:.2}", self.humidity_percent)
    }

    /// Temperature as the decimal string published to the broker.
    pub fn temperature_payload(&self) -> String {
        format!("{:.2}", self.temperature_celsius)
    }
}

/// The sensor behind each wake cycle's single blocking read.
pub trait HumiditySensor {
    fn sample(&mut self) -> Result<Reading, BoxError>;
}

#[test]
fn payloads_use_two_decimals() {
    let reading = Reading::new(55.0, 22.135);
    assert_eq!(reading.humidity_payload(), "55.00");
    assert_eq!(reading.temperature_payload(), "22.13");
}

#[test]
fn nan_marks_the_reading_invalid() {
    assert!(Reading::new(47.0, 20.0).is_valid());
    assert!(!Reading::new(f32::NAN, 20.0).is_valid());
    assert!(!Reading::new(47.0, f32::NAN).is_valid());
}

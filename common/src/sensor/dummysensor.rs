use serde::Deserialize;

use crate::sensor::{HumiditySensor, Reading};
use crate::BoxError;

/// Canned sensor fed from a bundled fixture, for exercising the full cycle
/// off-device. Yields its readings in order and repeats the last one once the
/// fixture is used up.
#[derive(Deserialize, Default)]
pub struct DummySensor {
    readings: Vec<Reading>,

    #[serde(skip)]
    next: usize,
}

impl DummySensor {
    pub fn new() -> Result<Self, serde_json::Error> {
        let json_data = std::include_str!("./dummyreadings.json");

        serde_json::from_str::<Self>(json_data)
    }
}

impl HumiditySensor for DummySensor {
    fn sample(&mut self) -> Result<Reading, BoxError> {
        let index = self.next.min(self.readings.len().saturating_sub(1));
        self.next += 1;

        self.readings
            .get(index)
            .copied()
            .ok_or_else(|| "dummy sensor fixture is empty".into())
    }
}

#[test]
fn test_dummy_sensor() {
    let mut sensor = DummySensor::new().unwrap();

    let first = sensor.sample().unwrap();
    assert_eq!(first.humidity_percent, 47.8);

    let second = sensor.sample().unwrap();
    assert_eq!(second.humidity_percent, 55.0);
    assert_eq!(second.temperature_celsius, 22.0);
}

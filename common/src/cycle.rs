//! One wake cycle: read the sensor, publish, evaluate the alert, persist the
//! warning flag. Connectivity is established by the caller before this runs;
//! sleeping afterwards is also the caller's job, so a sensor fault can still
//! end in a clean timed sleep.

use std::time::Duration;

use log::{error, info, warn};
use thiserror::Error;

use crate::alert::{self, AlertAction};
use crate::config::Config;
use crate::sensor::HumiditySensor;
use crate::BoxError;

/// Pause between the publishes and deep sleep, so the outbound messages can
/// leave the device before it powers down.
pub const PUBLISH_SETTLE: Duration = Duration::from_secs(1);

/// Fire-and-forget publish of one payload to one topic. No delivery
/// confirmation is expected from implementations.
pub trait ReadingPublisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), BoxError>;
}

/// Single blocking delivery of an alert message to the messaging webhook.
pub trait AlertDispatcher {
    fn dispatch(&mut self, message: &str) -> Result<(), BoxError>;
}

/// Durable storage for the `sentWarning` flag. Must survive deep sleep and
/// power loss between cycles.
pub trait WarningFlagStore {
    fn load(&mut self) -> Result<bool, BoxError>;
    fn save(&mut self, sent_warning: bool) -> Result<(), BoxError>;
}

/// Volatile flag store for dummy runs and tests.
#[derive(Debug, Default)]
pub struct InMemoryFlagStore {
    sent_warning: bool,
}

impl WarningFlagStore for InMemoryFlagStore {
    fn load(&mut self) -> Result<bool, BoxError> {
        Ok(self.sent_warning)
    }

    fn save(&mut self, sent_warning: bool) -> Result<(), BoxError> {
        self.sent_warning = sent_warning;
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    /// The sensor returned a fault; publish and alert evaluation were skipped.
    SensorFault,
}

#[derive(Debug, Error)]
pub enum CycleError {
    #[error("warning flag store: {0}")]
    FlagStore(BoxError),
}

/// Runs the publish/alert portion of one wake cycle.
///
/// Publish failures are ignored beyond a log line, and a failed alert dispatch
/// still leaves the warning flag set: the alert is sent-or-lost for this
/// cycle. Only flag-store failures surface as errors, since a wrong persisted
/// flag would corrupt every following cycle.
pub fn run_cycle<S, P, D, F, W>(
    config: &Config,
    sensor: &mut S,
    publisher: &mut P,
    dispatcher: &mut D,
    flags: &mut F,
    mut settle: W,
) -> Result<CycleOutcome, CycleError>
where
    S: HumiditySensor,
    P: ReadingPublisher,
    D: AlertDispatcher,
    F: WarningFlagStore,
    W: FnMut(Duration),
{
    let sent_warning = flags.load().map_err(CycleError::FlagStore)?;

    let reading = match sensor.sample() {
        Ok(reading) if reading.is_valid() => reading,
        Ok(_) => {
            error!("sensor returned NaN, skipping publish and alert for this cycle");
            return Ok(CycleOutcome::SensorFault);
        }
        Err(err) => {
            error!("failed to read sensor: {err}");
            return Ok(CycleOutcome::SensorFault);
        }
    };

    if let Err(err) = publisher.publish(&config.humidity_topic, &reading.humidity_payload()) {
        warn!("humidity publish failed: {err}");
    }
    if let Err(err) = publisher.publish(&config.temperature_topic, &reading.temperature_payload()) {
        warn!("temperature publish failed: {err}");
    }
    settle(PUBLISH_SETTLE);

    info!(
        "Humidity: {} %  Temperature: {} *C",
        reading.humidity_payload(),
        reading.temperature_payload()
    );

    match alert::evaluate(sent_warning, reading.humidity_percent, &config.thresholds) {
        AlertAction::Disarm => {
            flags.save(false).map_err(CycleError::FlagStore)?;
            info!("sentWarning cleared");
        }
        AlertAction::Trigger => {
            let message = alert::alert_message(&reading, &config.thresholds);
            info!("{message}");

            if let Err(err) = dispatcher.dispatch(&message) {
                error!("alert dispatch failed: {err}");
            }

            // Sent-or-lost: the flag is set even if the dispatch failed.
            flags.save(true).map_err(CycleError::FlagStore)?;
        }
        AlertAction::Hold => {}
    }

    Ok(CycleOutcome::Completed)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::sensor::Reading;

    struct FixedSensor(Result<Reading, &'static str>);

    impl HumiditySensor for FixedSensor {
        fn sample(&mut self) -> Result<Reading, BoxError> {
            self.0.map_err(Into::into)
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Vec<(String, String)>,
    }

    impl ReadingPublisher for RecordingPublisher {
        fn publish(&mut self, topic: &str, payload: &str) -> Result<(), BoxError> {
            self.published.push((topic.into(), payload.into()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Vec<String>,
        fail: bool,
    }

    impl AlertDispatcher for RecordingDispatcher {
        fn dispatch(&mut self, message: &str) -> Result<(), BoxError> {
            self.sent.push(message.into());
            if self.fail {
                Err("HTTP status 502".into())
            } else {
                Ok(())
            }
        }
    }

    /// Flag store over a shared cell standing in for an NVS partition, so a
    /// power cycle can be simulated by opening a second store over the same
    /// backing value.
    struct FakeNvsFlagStore {
        partition: Rc<RefCell<Option<bool>>>,
    }

    impl FakeNvsFlagStore {
        fn open(partition: &Rc<RefCell<Option<bool>>>) -> Self {
            Self {
                partition: partition.clone(),
            }
        }
    }

    impl WarningFlagStore for FakeNvsFlagStore {
        fn load(&mut self) -> Result<bool, BoxError> {
            Ok(self.partition.borrow().unwrap_or(false))
        }

        fn save(&mut self, sent_warning: bool) -> Result<(), BoxError> {
            *self.partition.borrow_mut() = Some(sent_warning);
            Ok(())
        }
    }

    fn config() -> Config {
        Config {
            wifi_ssid: "net".into(),
            broker_host: "192.168.1.20".into(),
            phone_number: "+1234567898765".into(),
            api_key: "abc123".into(),
            ..Config::default()
        }
    }

    fn run(
        reading: Result<Reading, &'static str>,
        flags: &mut impl WarningFlagStore,
    ) -> (CycleOutcome, RecordingPublisher, RecordingDispatcher) {
        let mut publisher = RecordingPublisher::default();
        let mut dispatcher = RecordingDispatcher::default();
        let outcome = run_cycle(
            &config(),
            &mut FixedSensor(reading),
            &mut publisher,
            &mut dispatcher,
            flags,
            |_| {},
        )
        .unwrap();
        (outcome, publisher, dispatcher)
    }

    #[test]
    fn high_humidity_dispatches_once_and_sets_flag() {
        let mut flags = InMemoryFlagStore::default();

        let (outcome, publisher, dispatcher) = run(Ok(Reading::new(55.0, 22.0)), &mut flags);

        assert_eq!(outcome, CycleOutcome::Completed);
        assert_eq!(dispatcher.sent.len(), 1);
        assert!(dispatcher.sent[0].contains("55.00"));
        assert!(dispatcher.sent[0].contains("22.00"));
        assert!(flags.load().unwrap());

        assert_eq!(
            publisher.published,
            vec![
                ("your/mqtt/topic/humidity".into(), "55.00".into()),
                ("your/mqtt/topic/temperature".into(), "22.00".into()),
            ]
        );
    }

    #[test]
    fn low_humidity_disarms_silently() {
        let mut flags = InMemoryFlagStore { sent_warning: true };

        let (outcome, _, dispatcher) = run(Ok(Reading::new(49.0, 21.0)), &mut flags);

        assert_eq!(outcome, CycleOutcome::Completed);
        assert!(dispatcher.sent.is_empty());
        assert!(!flags.load().unwrap());
    }

    #[test]
    fn dead_band_holds_the_armed_state() {
        for humidity in [49.1, 49.5, 50.0] {
            let mut flags = InMemoryFlagStore { sent_warning: true };

            let (_, _, dispatcher) = run(Ok(Reading::new(humidity, 21.0)), &mut flags);

            assert!(dispatcher.sent.is_empty(), "humidity {humidity}");
            assert!(flags.load().unwrap(), "humidity {humidity}");
        }
    }

    #[test]
    fn armed_state_suppresses_repeat_alerts() {
        let mut flags = InMemoryFlagStore { sent_warning: true };

        let (_, _, dispatcher) = run(Ok(Reading::new(82.0, 23.0)), &mut flags);

        assert!(dispatcher.sent.is_empty());
        assert!(flags.load().unwrap());
    }

    #[test]
    fn nan_reading_skips_publish_and_alert() {
        for reading in [
            Reading::new(f32::NAN, 22.0),
            Reading::new(55.0, f32::NAN),
        ] {
            let mut flags = InMemoryFlagStore::default();

            let (outcome, publisher, dispatcher) = run(Ok(reading), &mut flags);

            assert_eq!(outcome, CycleOutcome::SensorFault);
            assert!(publisher.published.is_empty());
            assert!(dispatcher.sent.is_empty());
            assert!(!flags.load().unwrap());
        }
    }

    #[test]
    fn sensor_error_skips_publish_and_alert() {
        let mut flags = InMemoryFlagStore::default();

        let (outcome, publisher, dispatcher) = run(Err("checksum mismatch"), &mut flags);

        assert_eq!(outcome, CycleOutcome::SensorFault);
        assert!(publisher.published.is_empty());
        assert!(dispatcher.sent.is_empty());
    }

    #[test]
    fn failed_dispatch_still_sets_the_flag() {
        let mut flags = InMemoryFlagStore::default();
        let mut publisher = RecordingPublisher::default();
        let mut dispatcher = RecordingDispatcher {
            fail: true,
            ..Default::default()
        };

        run_cycle(
            &config(),
            &mut FixedSensor(Ok(Reading::new(60.0, 20.0))),
            &mut publisher,
            &mut dispatcher,
            &mut flags,
            |_| {},
        )
        .unwrap();

        assert_eq!(dispatcher.sent.len(), 1);
        assert!(flags.load().unwrap());
    }

    #[test]
    fn flag_survives_a_simulated_power_cycle() {
        let partition = Rc::new(RefCell::new(None));

        {
            let mut flags = FakeNvsFlagStore::open(&partition);
            run(Ok(Reading::new(55.0, 22.0)), &mut flags);
        }

        // Deep sleep drops all in-memory state; only the partition survives.
        let mut flags = FakeNvsFlagStore::open(&partition);
        assert!(flags.load().unwrap());

        let (_, _, dispatcher) = run(Ok(Reading::new(55.0, 22.0)), &mut flags);
        assert!(
            dispatcher.sent.is_empty(),
            "no repeat alert after the power cycle"
        );
    }

    #[test]
    fn settle_runs_between_publish_and_alert() {
        let mut flags = InMemoryFlagStore::default();
        let mut publisher = RecordingPublisher::default();
        let mut dispatcher = RecordingDispatcher::default();
        let mut settled = Vec::new();

        run_cycle(
            &config(),
            &mut FixedSensor(Ok(Reading::new(10.0, 20.0))),
            &mut publisher,
            &mut dispatcher,
            &mut flags,
            |d| settled.push(d),
        )
        .unwrap();

        assert_eq!(settled, vec![PUBLISH_SETTLE]);
    }
}

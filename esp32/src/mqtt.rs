use std::thread;

use anyhow::bail;
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};
use log::info;

use humiwatch_common::config::Config;
use humiwatch_common::cycle::ReadingPublisher;
use humiwatch_common::retry::{RetriesExhausted, RetryPolicy};
use humiwatch_common::BoxError;

/// Connected MQTT client used for the two fire-and-forget publishes per
/// cycle.
pub struct MqttPublisher {
    client: EspMqttClient<'static>,
}

/// Opens a broker connection with the fixed client id, retrying per policy.
pub fn connect(config: &Config, retry: &RetryPolicy) -> Result<MqttPublisher, RetriesExhausted> {
    let url = config.broker_url();

    retry.run(
        "broker connect",
        |attempt| {
            info!("Connecting to MQTT broker {url} (attempt {attempt})");
            try_connect(&url, &config.client_id)
        },
        thread::sleep,
    )
}

fn try_connect(url: &str, client_id: &str) -> anyhow::Result<MqttPublisher> {
    let conf = MqttClientConfiguration {
        client_id: Some(client_id),
        ..Default::default()
    };

    let (client, mut connection) = EspMqttClient::new(url, &conf)?;

    // The CONNACK outcome arrives on the event connection; anything else
    // before it (a broker status, a disconnect) counts as a failed attempt.
    loop {
        let event = connection.next()?;
        match event.payload() {
            EventPayload::Connected(_) => break,
            EventPayload::Error(err) => bail!("broker reported: {err}"),
            EventPayload::Disconnected => bail!("disconnected before CONNACK"),
            _ => continue,
        }
    }

    // The client stalls unless its events keep being drained.
    thread::Builder::new()
        .name("mqtt-events".into())
        .spawn(move || while connection.next().is_ok() {})?;

    info!("Connected to MQTT broker");
    Ok(MqttPublisher { client })
}

impl ReadingPublisher for MqttPublisher {
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), BoxError> {
        // At-most-once, no retain: delivery is not confirmed by design.
        self.client
            .publish(topic, QoS::AtMostOnce, false, payload.as_bytes())?;
        Ok(())
    }
}

use std::thread;
use std::time::Duration;

use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::log::EspLogger;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::{error, warn};

use humiwatch_common::alert::Thresholds;
use humiwatch_common::config::{self, Config};
use humiwatch_common::cycle::{self, CycleOutcome};
use humiwatch_common::retry::RetryPolicy;

mod dht22;
mod mqtt;
mod power;
mod store;
mod webhook;
mod wifi;

/// Data line of the DHT22.
const DHT_GPIO: i32 = 18;

/// Wait between failed connect attempts.
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Builds the device configuration from compile-time environment variables,
/// falling back to defaults for everything a variable does not override.
fn device_config() -> Config {
    let defaults = Config::default();
    Config {
        wifi_ssid: option_env!("WIFI_SSID").unwrap_or_default().into(),
        wifi_password: option_env!("WIFI_PASS").unwrap_or_default().into(),
        broker_host: option_env!("MQTT_HOST").unwrap_or_default().into(),
        broker_port: config::parse_override(option_env!("MQTT_PORT"), defaults.broker_port),
        client_id: option_env!("MQTT_CLIENT_ID")
            .map(Into::into)
            .unwrap_or(defaults.client_id),
        temperature_topic: option_env!("TEMPERATURE_TOPIC")
            .map(Into::into)
            .unwrap_or(defaults.temperature_topic),
        humidity_topic: option_env!("HUMIDITY_TOPIC")
            .map(Into::into)
            .unwrap_or(defaults.humidity_topic),
        thresholds: Thresholds {
            trigger: config::parse_override(
                option_env!("HUMIDITY_TRIGGER"),
                defaults.thresholds.trigger,
            ),
            reset: config::parse_override(
                option_env!("HUMIDITY_RESET"),
                defaults.thresholds.reset,
            ),
        },
        phone_number: option_env!("ALERT_PHONE").unwrap_or_default().into(),
        api_key: option_env!("ALERT_API_KEY").unwrap_or_default().into(),
        sleep_duration: Duration::from_secs(config::parse_override(
            option_env!("SLEEP_SECONDS"),
            defaults.sleep_duration.as_secs(),
        )),
        connect_attempts: config::parse_override(
            option_env!("CONNECT_ATTEMPTS"),
            defaults.connect_attempts,
        ),
    }
}

fn main() -> anyhow::Result<()> {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    EspLogger::initialize_default();

    let config = device_config();
    if let Err(err) = config.validate() {
        error!("Invalid device configuration: {err}");
        return Err(err.into());
    }

    // Arm the wake timer before anything can fail, so that every path out of
    // this cycle, including a sensor fault, ends in a timed deep sleep.
    power::enable_timer_wakeup(config.sleep_duration)?;

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    let mut flags = store::NvsFlagStore::open(nvs_partition.clone())?;

    let retry = RetryPolicy::new(config.connect_attempts, RETRY_DELAY);

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs_partition))?,
        sys_loop,
    )?;
    if let Err(err) = wifi::connect(&mut wifi, &config, &retry) {
        error!("{err}");
        power::restart();
    }

    let mut publisher = match mqtt::connect(&config, &retry) {
        Ok(publisher) => publisher,
        Err(err) => {
            error!("{err}");
            power::restart();
        }
    };

    let mut sensor = dht22::Dht22::new(DHT_GPIO);
    let mut dispatcher = webhook::CallMeBot::new(&config);

    match cycle::run_cycle(
        &config,
        &mut sensor,
        &mut publisher,
        &mut dispatcher,
        &mut flags,
        thread::sleep,
    )? {
        CycleOutcome::Completed => {}
        CycleOutcome::SensorFault => warn!("Skipping cycle after sensor fault"),
    }

    // Close the NVS handle before execution stops for good.
    drop(flags);

    power::deep_sleep()
}

use std::thread;

use anyhow::anyhow;
use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use log::info;

use humiwatch_common::config::Config;
use humiwatch_common::retry::RetryPolicy;

type Wifi = BlockingWifi<EspWifi<'static>>;

/// Joins the configured network in station mode. Each failed attempt is
/// logged and waits out the policy delay; exhaustion bubbles up so the
/// caller can hard-restart the device.
pub fn connect(wifi: &mut Wifi, config: &Config, retry: &RetryPolicy) -> anyhow::Result<()> {
    let wifi_configuration: Configuration = Configuration::Client(ClientConfiguration {
        ssid: config
            .wifi_ssid
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi ssid too long"))?,
        bssid: None,
        auth_method: AuthMethod::WPA2Personal,
        password: config
            .wifi_password
            .as_str()
            .try_into()
            .map_err(|_| anyhow!("wifi password too long"))?,
        channel: None,
        ..Default::default()
    });

    wifi.set_configuration(&wifi_configuration)?;

    wifi.start()?;
    info!("Wifi started");

    retry.run(
        "wifi join",
        |attempt| {
            info!("Connecting to WiFi... (attempt {attempt})");
            let joined = wifi.connect().and_then(|()| wifi.wait_netif_up());
            if joined.is_err() {
                let _ = wifi.disconnect();
            }
            joined
        },
        thread::sleep,
    )?;
    info!("Wifi connected");

    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    info!("Wifi DHCP info: {:?}", ip_info);

    Ok(())
}

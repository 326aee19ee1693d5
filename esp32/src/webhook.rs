use anyhow::bail;
use embedded_svc::http::{client::Client as HttpClient, Method};
use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
use log::info;

use humiwatch_common::config::Config;
use humiwatch_common::cycle::AlertDispatcher;
use humiwatch_common::{webhook, BoxError};

/// Dispatches alert messages through the CallMeBot messaging webhook with a
/// single blocking HTTPS request. No retry: a failed dispatch is lost for
/// this cycle.
pub struct CallMeBot {
    phone_number: String,
    api_key: String,
}

impl CallMeBot {
    pub fn new(config: &Config) -> Self {
        Self {
            phone_number: config.phone_number.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn send(&self, message: &str) -> anyhow::Result<()> {
        let url = webhook::alert_url(&self.phone_number, &self.api_key, message);

        let connection = EspHttpConnection::new(&HttpConfiguration {
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        })?;
        let mut client = HttpClient::wrap(connection);

        let headers = [("accept", "text/plain")];
        let request = client.request(Method::Get, &url, &headers)?;
        let response = request.submit()?;

        let status = response.status();
        if status == 200 {
            info!("Message sent successfully");
            Ok(())
        } else {
            bail!("HTTP response code: {status}")
        }
    }
}

impl AlertDispatcher for CallMeBot {
    fn dispatch(&mut self, message: &str) -> Result<(), BoxError> {
        self.send(message).map_err(Into::into)
    }
}

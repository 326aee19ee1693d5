use std::fmt;

use humiwatch_common::sensor::{HumiditySensor, Reading};
use humiwatch_common::BoxError;

/// Bit-banged DHT22 driver. The sensor answers a start pulse with 40 data
/// bits encoded in pulse widths: 16 bits humidity, 16 bits temperature, 8
/// bits checksum, all timed in microseconds on a single GPIO.
pub struct Dht22 {
    pin: i32,
}

#[derive(Debug)]
pub enum Dht22Error {
    /// The sensor did not answer, or a pulse exceeded its timing window.
    Timeout,
    /// All 40 bits arrived but the checksum byte does not match.
    Checksum,
}

impl fmt::Display for Dht22Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dht22Error::Timeout => write!(f, "sensor read timed out"),
            Dht22Error::Checksum => write!(f, "sensor checksum mismatch"),
        }
    }
}

impl std::error::Error for Dht22Error {}

impl Dht22 {
    const DATA_BYTES: usize = 5;

    pub fn new(pin: i32) -> Self {
        Self { pin }
    }

    /// Busy-waits until the line leaves `level`, returning the pulse width in
    /// microseconds, or `None` once `max_wait` is exceeded.
    fn pulse_width(&self, level: i32, max_wait: i32) -> Option<i32> {
        use esp_idf_svc::sys::*;

        let mut width = 0;
        unsafe {
            while gpio_get_level(self.pin) == level {
                width += 1;
                if width > max_wait {
                    return None;
                }
                ets_delay_us(1);
            }
        }

        Some(width)
    }

    pub fn read(&self) -> Result<Reading, Dht22Error> {
        use esp_idf_svc::sys::*;

        let mut data = [0u8; Self::DATA_BYTES];

        unsafe {
            gpio_set_direction(self.pin, GPIO_MODE_DEF_OUTPUT);

            // Start signal: hold the line low for 3 ms, release for 25 us.
            gpio_set_level(self.pin, 0);
            ets_delay_us(3000);
            gpio_set_level(self.pin, 1);
            ets_delay_us(25);

            gpio_set_direction(self.pin, GPIO_MODE_DEF_INPUT);
        }

        // The sensor acknowledges with 80 us low, 80 us high.
        self.pulse_width(0, 85).ok_or(Dht22Error::Timeout)?;
        self.pulse_width(1, 85).ok_or(Dht22Error::Timeout)?;

        for bit in 0..40 {
            // Every bit starts with a >50 us low phase; the length of the
            // following high phase decides between 0 and 1 (a 1 is >28 us).
            self.pulse_width(0, 56).ok_or(Dht22Error::Timeout)?;
            let high = self.pulse_width(1, 75).ok_or(Dht22Error::Timeout)?;

            if high > 40 {
                data[bit / 8] |= 1 << (7 - bit % 8);
            }
        }

        let checksum = data[0]
            .wrapping_add(data[1])
            .wrapping_add(data[2])
            .wrapping_add(data[3]);
        if data[4] != checksum {
            return Err(Dht22Error::Checksum);
        }

        let humidity = u16::from_be_bytes([data[0], data[1]]) as f32 / 10.0;
        let mut temperature = u16::from_be_bytes([data[2] & 0x7F, data[3]]) as f32 / 10.0;
        if data[2] & 0x80 != 0 {
            temperature = -temperature;
        }

        Ok(Reading::new(humidity, temperature))
    }
}

impl HumiditySensor for Dht22 {
    fn sample(&mut self) -> Result<Reading, BoxError> {
        self.read().map_err(Into::into)
    }
}

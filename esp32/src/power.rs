use std::time::Duration;

use log::{info, warn};

/// Arms the one-shot timer wake source for the next cycle.
pub fn enable_timer_wakeup(after: Duration) -> anyhow::Result<()> {
    esp_idf_svc::sys::esp!(unsafe {
        esp_idf_svc::sys::esp_sleep_enable_timer_wakeup(after.as_micros() as u64)
    })?;
    Ok(())
}

/// Suspends the device until the wake timer fires. Execution restarts from
/// the top of `main`; nothing but NVS survives.
pub fn deep_sleep() -> ! {
    info!("Entering deep sleep");
    unsafe { esp_idf_svc::sys::esp_deep_sleep_start() }
}

/// Terminal recovery for exhausted connect retries: full reset, in-memory
/// state discarded, persisted storage kept.
pub fn restart() -> ! {
    warn!("Restarting device");
    unsafe { esp_idf_svc::sys::esp_restart() }
}

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};

use humiwatch_common::cycle::WarningFlagStore;
use humiwatch_common::BoxError;

const NAMESPACE: &str = "humiwatch";
const SENT_WARNING_KEY: &str = "sentWarning";

/// `sentWarning` flag in non-volatile storage; the only state that survives
/// the deep-sleep boundary between cycles. Absent key reads as false.
pub struct NvsFlagStore {
    nvs: EspNvs<NvsDefault>,
}

impl NvsFlagStore {
    pub fn open(partition: EspDefaultNvsPartition) -> anyhow::Result<Self> {
        Ok(Self {
            nvs: EspNvs::new(partition, NAMESPACE, true)?,
        })
    }
}

impl WarningFlagStore for NvsFlagStore {
    fn load(&mut self) -> Result<bool, BoxError> {
        Ok(self.nvs.get_u8(SENT_WARNING_KEY)?.unwrap_or(0) != 0)
    }

    fn save(&mut self, sent_warning: bool) -> Result<(), BoxError> {
        self.nvs.set_u8(SENT_WARNING_KEY, sent_warning as u8)?;
        Ok(())
    }
}

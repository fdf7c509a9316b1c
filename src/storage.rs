use esp_idf_svc::nvs::{EspNvs, NvsPartitionId};
use esp_idf_svc::sys::EspError;
use motion::position::{PositionStorage, ERASED};

pub const NAMESPACE: &str = "tracker";
const SEGMENT_KEY: &str = "segment";

/// Persists the segment byte in an NVS namespace. A missing key reads back as
/// an erased byte.
pub struct NvsPositionStorage<T: NvsPartitionId> {
    nvs: EspNvs<T>,
}

impl<T: NvsPartitionId> NvsPositionStorage<T> {
    pub fn new(nvs: EspNvs<T>) -> Self {
        NvsPositionStorage { nvs }
    }
}

impl<T: NvsPartitionId> PositionStorage for NvsPositionStorage<T> {
    type Error = EspError;

    fn read_byte(&mut self) -> Result<u8, EspError> {
        Ok(self.nvs.get_u8(SEGMENT_KEY)?.unwrap_or(ERASED))
    }

    // Skip identical writes to spare the flash
    fn update_byte(&mut self, value: u8) -> Result<(), EspError> {
        if self.nvs.get_u8(SEGMENT_KEY)? == Some(value) {
            return Ok(());
        }
        self.nvs.set_u8(SEGMENT_KEY, value)
    }
}

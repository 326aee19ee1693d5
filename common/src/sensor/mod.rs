mod dummysensor;
mod humiditysensor;

pub use dummysensor::DummySensor;
pub use humiditysensor::{HumiditySensor, Reading};

//! Compute device selection.

use candle_core::Device;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Where tensors live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum DeviceChoice {
    /// Host memory.
    Cpu,
    /// First CUDA GPU. Needs the `cuda` feature.
    Cuda,
    /// First Metal GPU. Needs the `metal` feature.
    Metal,
    /// The first accelerator compiled in and present, else CPU.
    #[default]
    Auto,
}

impl DeviceChoice {
    /// Open the device.
    ///
    /// # Errors
    ///
    /// Returns a tensor error when an explicit accelerator is unavailable.
    pub fn open(self) -> Result<Device> {
        let device = match self {
            Self::Cpu => Device::Cpu,
            Self::Cuda => Device::new_cuda(0)?,
            Self::Metal => Device::new_metal(0)?,
            Self::Auto => {
                if candle_core::utils::cuda_is_available() {
                    Device::new_cuda(0)?
                } else if candle_core::utils::metal_is_available() {
                    Device::new_metal(0)?
                } else {
                    Device::Cpu
                }
            }
        };
        log::info!("using {device:?}");
        Ok(device)
    }
}

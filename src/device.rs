//! Backend selection and a shared default device.
//!
//! Layers take the device from the caller; this module only supplies the
//! default one used by the binaries and tests. The CPU `NdArray` backend is
//! used unless the crate is built with the `wgpu` feature.

use burn::backend::Autodiff;
use log::info;
use std::sync::OnceLock;

/// Type alias for the backend used throughout the project
#[cfg(not(feature = "wgpu"))]
pub type Backend = burn::backend::NdArray<f32>;

/// Type alias for the backend used throughout the project
#[cfg(feature = "wgpu")]
pub type Backend = burn::backend::Wgpu<f32, i32>;

/// Type alias for autodiff backend used in training
pub type AutodiffBackend = Autodiff<Backend>;

pub type Device = <Backend as burn::tensor::backend::Backend>::Device;

static DEVICE: OnceLock<Device> = OnceLock::new();

/// Default device for [`Backend`], created once per process.
///
/// # Example
/// ```rust
/// use bibd_rust::device::init_device;
///
/// let device = init_device();
/// ```
pub fn init_device() -> Device {
    DEVICE
        .get_or_init(|| {
            let device = Device::default();
            info!("Initialized device: {:?}", device);
            device
        })
        .clone()
}

//! Device acquisition.

use std::sync::Arc;

use crate::error::GpuError;

/// Push constant bytes a chunk draw needs (anchor + scale).
const PUSH_CONSTANT_BYTES: u32 = 16;

/// Shared device and queue.
#[derive(Clone)]
pub struct GpuContext {
    /// Logical device.
    pub device: Arc<wgpu::Device>,
    /// Submission queue.
    pub queue: Arc<wgpu::Queue>,
    /// Adapter name, for logs.
    pub adapter_name: String,
}

impl GpuContext {
    /// Opens a device without a surface. Blocks until the adapter answers.
    ///
    /// # Errors
    ///
    /// Returns an error if no adapter is available or device creation fails.
    pub fn headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;
        Self::from_adapter(&adapter)
    }

    /// Opens a device on an already chosen adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter cannot run chunk draws or device
    /// creation fails.
    pub fn from_adapter(adapter: &wgpu::Adapter) -> Result<Self, GpuError> {
        let adapter_name = adapter.get_info().name;
        let (required_features, required_limits) =
            device_requirements(adapter.features(), adapter.limits())?;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("STRATA Device"),
                required_features,
                required_limits,
            },
            None,
        ))?;

        tracing::info!("gpu: using {}", adapter_name);
        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name,
        })
    }
}

/// Features and limits to request from an adapter.
///
/// Chunk draws carry their anchor in a vertex push constant, so adapters
/// without the feature are rejected here rather than at the first draw.
fn device_requirements(
    features: wgpu::Features,
    limits: wgpu::Limits,
) -> Result<(wgpu::Features, wgpu::Limits), GpuError> {
    if !features.contains(wgpu::Features::PUSH_CONSTANTS) {
        return Err(GpuError::MissingFeature {
            feature: "PUSH_CONSTANTS",
        });
    }
    if limits.max_push_constant_size < PUSH_CONSTANT_BYTES {
        return Err(GpuError::MissingFeature {
            feature: "16 bytes of push constants",
        });
    }

    let mut required_limits = wgpu::Limits::downlevel_defaults().using_resolution(limits);
    required_limits.max_push_constant_size = PUSH_CONSTANT_BYTES;
    Ok((wgpu::Features::PUSH_CONSTANTS, required_limits))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_without_push_constants_is_rejected() {
        let err = device_requirements(wgpu::Features::empty(), wgpu::Limits::default()).unwrap_err();
        assert!(matches!(err, GpuError::MissingFeature { feature: "PUSH_CONSTANTS" }));
    }

    #[test]
    fn test_small_push_constant_limit_is_rejected() {
        let limits = wgpu::Limits {
            max_push_constant_size: 8,
            ..wgpu::Limits::default()
        };
        let err = device_requirements(wgpu::Features::PUSH_CONSTANTS, limits).unwrap_err();
        assert!(matches!(err, GpuError::MissingFeature { .. }));
    }

    #[test]
    fn test_push_constants_are_requested() {
        let limits = wgpu::Limits {
            max_push_constant_size: 128,
            ..wgpu::Limits::default()
        };
        let (features, required) = device_requirements(wgpu::Features::PUSH_CONSTANTS, limits).unwrap();
        assert!(features.contains(wgpu::Features::PUSH_CONSTANTS));
        assert_eq!(required.max_push_constant_size, PUSH_CONSTANT_BYTES);
    }
}

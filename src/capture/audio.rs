//! Audio input device enumeration
//!
//! Lists microphones through cpal, for the device picker and for resolving
//! the optional audio input of a session configuration.

use cpal::traits::{DeviceTrait, HostTrait};

use super::traits::AudioDeviceInfo;

/// Get list of available audio input devices (microphones)
pub fn input_devices() -> Vec<AudioDeviceInfo> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = match host.input_devices() {
        Ok(devices) => devices,
        Err(e) => {
            tracing::warn!("Failed to enumerate audio input devices: {e}");
            return Vec::new();
        }
    };

    devices
        .filter_map(|device| {
            let name = device.name().ok()?;
            let is_default = default_name.as_deref() == Some(name.as_str());
            Some(AudioDeviceInfo {
                // cpal exposes no stable device ID, the name is the ID
                id: name.clone(),
                name,
                is_default,
            })
        })
        .collect()
}

/// The default microphone, or the first input device when the host does not
/// mark a default. `None` when the machine has no input device at all.
pub fn default_input() -> Option<AudioDeviceInfo> {
    let devices = input_devices();
    devices
        .iter()
        .find(|device| device.is_default)
        .cloned()
        .or_else(|| devices.into_iter().next())
}

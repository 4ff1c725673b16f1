//! Device authorization hook.

use std::collections::HashSet;

use crate::sanitize;

/// Decides whether a workstation may be used to log in.
pub trait DeviceAuthorizer: Send + Sync {
    fn is_authorized(&self, device_id: &str) -> bool;
}

/// Authorizes every device.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllDevices;

impl DeviceAuthorizer for AllowAllDevices {
    fn is_authorized(&self, _device_id: &str) -> bool {
        true
    }
}

/// Authorizes only the listed device ids.
#[derive(Debug, Default, Clone)]
pub struct DeviceAllowList {
    devices: HashSet<String>,
}

impl DeviceAllowList {
    pub fn new<I, S>(devices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            devices: devices.into_iter().map(Into::into).collect(),
        }
    }
}

impl DeviceAuthorizer for DeviceAllowList {
    fn is_authorized(&self, device_id: &str) -> bool {
        self.devices.contains(device_id)
    }
}

/// Identifier for the local machine: a hash of host name and OS.
///
/// Falls back to a random id when the host name cannot be read.
pub fn local_device_id() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().trim().to_string())
        .ok()
        .filter(|h| !h.is_empty());

    match host {
        Some(host) => device_id_for(&host),
        None => {
            log::warn!("No host name available, using a random device id");
            uuid::Uuid::new_v4().to_string()
        }
    }
}

fn device_id_for(host: &str) -> String {
    sanitize::hash_str(&format!("{}-{}", host, std::env::consts::OS))
}

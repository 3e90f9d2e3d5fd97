//! CANopen manager and device configuration
//!
//! A [`CanOpenManagerInfo`] describes the NMT master on one CAN interface of a
//! node together with every device it manages. Validation is a pure function
//! of the current settings and is re-run after each edit.

use crate::error::{ModelError, Result};
use crc::{Crc, Digest, CRC_32_ISO_HDLC};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Smallest valid CANopen node ID
pub const NODE_ID_MIN: u8 = 1;
/// Largest valid CANopen node ID
pub const NODE_ID_MAX: u8 = 127;

pub(crate) static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn node_id_valid(node_id: u8) -> bool {
    (NODE_ID_MIN..=NODE_ID_MAX).contains(&node_id)
}

// ============================================================================
// Identities and settings
// ============================================================================

/// One CAN interface of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanOpenInterfaceId {
    pub node_index: u32,
    pub interface_number: u8,
}

impl CanOpenInterfaceId {
    pub fn new(node_index: u32, interface_number: u8) -> Self {
        Self {
            node_index,
            interface_number,
        }
    }

    pub fn hash_into(&self, digest: &mut Digest<'_, u32>) {
        digest.update(&self.node_index.to_ne_bytes());
        digest.update(&[self.interface_number]);
    }
}

impl fmt::Display for CanOpenInterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}:can{}", self.node_index, self.interface_number)
    }
}

/// What the manager does when a mandatory device fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum NmtErrorBehaviour {
    RestartAllDevices = 0,
    RestartFailureDevice = 1,
    #[default]
    StopAllDevices = 2,
    StopFailureDevice = 3,
}

pub(crate) fn update_bool(digest: &mut Digest<'_, u32>, value: bool) {
    digest.update(&[u8::from(value)]);
}

/// Settings of one managed CANopen device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanOpenDeviceInfo {
    pub eds_file_name: String,
    pub device_optional: bool,
    pub no_initialization: bool,
    pub factory_settings_active: bool,
    pub reset_node_object_dictionary_sub_index: u8,
    pub enable_heartbeat_producing: bool,
    pub heartbeat_producer_time_ms: u16,
    /// Take the node ID from the node's interface configuration
    pub use_opensyde_node_id: bool,
    pub node_id: u8,
    pub sdo_timeout_ms: u16,
    pub enable_heartbeat_consuming: bool,
    /// Timeout for the manager heartbeat; must exceed the producer period
    pub heartbeat_consumer_time_ms: u16,
    pub enable_heartbeat_consuming_auto_calculation: bool,
}

impl Default for CanOpenDeviceInfo {
    fn default() -> Self {
        Self {
            eds_file_name: String::new(),
            device_optional: false,
            no_initialization: false,
            factory_settings_active: false,
            reset_node_object_dictionary_sub_index: 1,
            enable_heartbeat_producing: true,
            heartbeat_producer_time_ms: 100,
            use_opensyde_node_id: true,
            node_id: 0,
            sdo_timeout_ms: 100,
            enable_heartbeat_consuming: true,
            heartbeat_consumer_time_ms: 150,
            enable_heartbeat_consuming_auto_calculation: true,
        }
    }
}

impl CanOpenDeviceInfo {
    pub fn with_node_id(node_id: u8) -> Self {
        Self {
            node_id,
            ..Self::default()
        }
    }

    pub fn hash_into(&self, digest: &mut Digest<'_, u32>) {
        digest.update(self.eds_file_name.as_bytes());
        update_bool(digest, self.device_optional);
        update_bool(digest, self.no_initialization);
        update_bool(digest, self.factory_settings_active);
        digest.update(&[self.reset_node_object_dictionary_sub_index]);
        update_bool(digest, self.enable_heartbeat_producing);
        digest.update(&self.heartbeat_producer_time_ms.to_ne_bytes());
        update_bool(digest, self.use_opensyde_node_id);
        digest.update(&[self.node_id]);
        digest.update(&self.sdo_timeout_ms.to_ne_bytes());
        update_bool(digest, self.enable_heartbeat_consuming);
        digest.update(&self.heartbeat_consumer_time_ms.to_ne_bytes());
        update_bool(digest, self.enable_heartbeat_consuming_auto_calculation);
    }
}

/// CANopen manager settings of one interface plus its devices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanOpenManagerInfo {
    pub use_opensyde_node_id: bool,
    /// 0 until configured
    pub node_id: u8,
    pub sdo_timeout_ms: u16,
    pub autostart_manager: bool,
    pub start_devices: bool,
    pub nmt_start_all: bool,
    pub nmt_error_behaviour: NmtErrorBehaviour,
    pub enable_heartbeat_producing: bool,
    pub heartbeat_producer_time_ms: u16,
    pub enable_sync: bool,
    pub sync_cycle_period_us: u32,
    pub sync_window_length_us: u32,
    #[serde(with = "crate::serde_entries")]
    pub devices: BTreeMap<CanOpenInterfaceId, CanOpenDeviceInfo>,
}

impl Default for CanOpenManagerInfo {
    fn default() -> Self {
        Self {
            use_opensyde_node_id: true,
            node_id: 0,
            sdo_timeout_ms: 100,
            autostart_manager: true,
            start_devices: true,
            nmt_start_all: false,
            nmt_error_behaviour: NmtErrorBehaviour::default(),
            enable_heartbeat_producing: true,
            heartbeat_producer_time_ms: 100,
            enable_sync: false,
            sync_cycle_period_us: 20_000,
            sync_window_length_us: 10_000,
            devices: BTreeMap::new(),
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Node ID findings for one device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DeviceNodeIdReport {
    /// Shares its node ID with the manager or, if requested, another device
    pub conflict: bool,
    /// Outside `1..=127`
    pub invalid: bool,
}

/// Aggregated findings for a manager and all its devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ManagerErrorReport {
    pub manager_node_id_invalid: bool,
    pub device_node_id_conflict: bool,
    pub device_node_id_invalid: bool,
    pub heartbeat_time_invalid: bool,
}

impl ManagerErrorReport {
    pub fn has_error(&self) -> bool {
        self.manager_node_id_invalid
            || self.device_node_id_conflict
            || self.device_node_id_invalid
            || self.heartbeat_time_invalid
    }
}

impl CanOpenManagerInfo {
    pub fn device(&self, device_id: &CanOpenInterfaceId) -> Result<&CanOpenDeviceInfo> {
        self.devices
            .get(device_id)
            .ok_or_else(|| ModelError::range(format!("Unknown CANopen device {}", device_id)))
    }

    /// Run every manager and device check
    ///
    /// Device node ID findings are OR-combined over all devices. The heartbeat
    /// check stops at the first violating device.
    pub fn check_error_manager(&self, check_device_to_device: bool) -> ManagerErrorReport {
        let mut report = ManagerErrorReport {
            manager_node_id_invalid: !node_id_valid(self.node_id),
            ..ManagerErrorReport::default()
        };

        for (device_id, device) in &self.devices {
            let node_id = self.device_node_id_report(device_id, device, check_device_to_device);
            report.device_node_id_conflict |= node_id.conflict;
            report.device_node_id_invalid |= node_id.invalid;
        }

        report.heartbeat_time_invalid = self
            .devices
            .values()
            .any(|device| self.device_heartbeat_invalid(device));

        debug!(
            "CANopen manager check: {} devices, {:?}",
            self.devices.len(),
            report
        );
        report
    }

    /// Node ID conflict/validity of one device
    pub fn check_error_device_co_node_id(
        &self,
        device_id: &CanOpenInterfaceId,
        check_device_to_device: bool,
    ) -> Result<DeviceNodeIdReport> {
        let device = self.device(device_id)?;
        Ok(self.device_node_id_report(device_id, device, check_device_to_device))
    }

    /// Whether the device's heartbeat consumer timeout is not above the
    /// manager's producer period while both are enabled
    pub fn check_error_device_heartbeat(&self, device_id: &CanOpenInterfaceId) -> Result<bool> {
        let device = self.device(device_id)?;
        Ok(self.device_heartbeat_invalid(device))
    }

    fn device_node_id_report(
        &self,
        device_id: &CanOpenInterfaceId,
        device: &CanOpenDeviceInfo,
        check_device_to_device: bool,
    ) -> DeviceNodeIdReport {
        let mut conflict = device.node_id == self.node_id;
        if !conflict && check_device_to_device {
            conflict = self
                .devices
                .iter()
                .any(|(other_id, other)| other_id != device_id && other.node_id == device.node_id);
        }
        DeviceNodeIdReport {
            conflict,
            invalid: !node_id_valid(device.node_id),
        }
    }

    fn device_heartbeat_invalid(&self, device: &CanOpenDeviceInfo) -> bool {
        self.enable_heartbeat_producing
            && device.enable_heartbeat_consuming
            && device.heartbeat_consumer_time_ms <= self.heartbeat_producer_time_ms
    }

    // ========================================================================
    // Change detection
    // ========================================================================

    /// Feed every setting and then every device, in map order, into `digest`
    ///
    /// Uses native byte order: only comparable within one process/architecture.
    pub fn hash_into(&self, digest: &mut Digest<'_, u32>) {
        update_bool(digest, self.use_opensyde_node_id);
        digest.update(&[self.node_id]);
        digest.update(&self.sdo_timeout_ms.to_ne_bytes());
        update_bool(digest, self.autostart_manager);
        update_bool(digest, self.start_devices);
        update_bool(digest, self.nmt_start_all);
        digest.update(&[self.nmt_error_behaviour as u8]);
        update_bool(digest, self.enable_heartbeat_producing);
        digest.update(&self.heartbeat_producer_time_ms.to_ne_bytes());
        update_bool(digest, self.enable_sync);
        digest.update(&self.sync_cycle_period_us.to_ne_bytes());
        digest.update(&self.sync_window_length_us.to_ne_bytes());

        for (device_id, device) in &self.devices {
            device_id.hash_into(digest);
            device.hash_into(digest);
        }
    }

    /// CRC-32 of the configuration, continuing from `seed`
    pub fn calc_hash(&self, seed: u32) -> u32 {
        let mut digest = CRC32.digest_with_initial(seed);
        self.hash_into(&mut digest);
        digest.finalize()
    }
}

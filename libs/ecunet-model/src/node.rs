//! Node configuration root

use crate::canopen::CanOpenManagerInfo;
use crate::datapool::DataPool;
use crate::error::{ModelError, Result};
use crate::protocol::{Protocol, ProtocolKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One ECU of the network: its data pools, COM protocols and CANopen managers
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(default)]
    pub data_pools: Vec<DataPool>,
    #[serde(default)]
    pub protocols: Vec<Protocol>,
    /// CANopen managers keyed by CAN interface number
    #[serde(default, with = "crate::serde_entries")]
    pub canopen_managers: BTreeMap<u8, CanOpenManagerInfo>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// COM data pool a protocol stores its signals in
    pub fn com_data_pool(&self, protocol: &Protocol) -> Result<&DataPool> {
        self.data_pools
            .get(protocol.data_pool_index as usize)
            .ok_or_else(|| {
                ModelError::range(format!(
                    "{} protocol refers to data pool {} but node '{}' has {}",
                    protocol.kind,
                    protocol.data_pool_index,
                    self.name,
                    self.data_pools.len()
                ))
            })
    }

    pub fn protocols_of_kind(&self, kind: ProtocolKind) -> impl Iterator<Item = &Protocol> {
        self.protocols.iter().filter(move |p| p.kind == kind)
    }

    pub fn canopen_manager(&self, interface_number: u8) -> Option<&CanOpenManagerInfo> {
        self.canopen_managers.get(&interface_number)
    }
}

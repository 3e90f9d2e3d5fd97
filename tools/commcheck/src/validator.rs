//! Node validation
//!
//! Collects every finding of a node as a human readable line. The model crate
//! only reports booleans and typed errors; wording lives here.

use ecunet_model::{
    CanOpenManagerInfo, DataPool, MessageId, MessageLayoutReport, Node, Protocol,
};
use tracing::{debug, info};

/// Result of a validation run
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors
    pub errors: Vec<String>,
    /// Number of messages whose signals were resolved
    pub messages_checked: usize,
    /// Number of data pool elements whose value was range checked
    pub elements_checked: usize,
}

impl ValidationResult {
    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn validate_node(node: &Node, check_device_to_device: bool) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (interface_number, manager) in &node.canopen_managers {
        check_manager(*interface_number, manager, check_device_to_device, &mut result);
    }

    for protocol in &node.protocols {
        match node.com_data_pool(protocol) {
            Ok(data_pool) => check_protocol(protocol, data_pool, &mut result),
            Err(e) => result.errors.push(e.to_string()),
        }
    }

    for data_pool in &node.data_pools {
        check_values(data_pool, &mut result);
    }

    info!(
        "Validated node '{}': {} messages, {} elements, {} errors",
        node.name,
        result.messages_checked,
        result.elements_checked,
        result.errors.len()
    );
    result
}

fn check_manager(
    interface_number: u8,
    manager: &CanOpenManagerInfo,
    check_device_to_device: bool,
    result: &mut ValidationResult,
) {
    let prefix = format!("CANopen manager on CAN{}", interface_number);
    let report = manager.check_error_manager(check_device_to_device);
    debug!("{}: {:?}", prefix, report);
    if !report.has_error() {
        return;
    }

    if report.manager_node_id_invalid {
        result.errors.push(format!(
            "{}: node ID {} is outside 1..=127",
            prefix, manager.node_id
        ));
    }

    // Per-device detail for the aggregated flags
    for (device_id, device) in &manager.devices {
        if let Ok(node_id) =
            manager.check_error_device_co_node_id(device_id, check_device_to_device)
        {
            if node_id.invalid {
                result.errors.push(format!(
                    "{}: device {} node ID {} is outside 1..=127",
                    prefix, device_id, device.node_id
                ));
            }
            if node_id.conflict {
                result.errors.push(format!(
                    "{}: device {} node ID {} is already in use",
                    prefix, device_id, device.node_id
                ));
            }
        }
        if let Ok(true) = manager.check_error_device_heartbeat(device_id) {
            result.errors.push(format!(
                "{}: device {} heartbeat consumer time {} ms must exceed producer time {} ms",
                prefix,
                device_id,
                device.heartbeat_consumer_time_ms,
                manager.heartbeat_producer_time_ms
            ));
        }
    }
}

fn check_protocol(protocol: &Protocol, data_pool: &DataPool, result: &mut ValidationResult) {
    for (interface_index, container) in protocol.message_containers.iter().enumerate() {
        if !container.used_by_interface {
            continue;
        }
        let interface_index = interface_index as u32;
        for tx in [true, false] {
            for (message_index, message) in container.messages(tx).iter().enumerate() {
                let id = MessageId {
                    protocol: protocol.kind,
                    data_pool_index: protocol.data_pool_index,
                    interface_index,
                    tx,
                    message_index: message_index as u32,
                };
                result.messages_checked += 1;

                if let Err(e) = protocol.all_signals_for_message(
                    data_pool,
                    interface_index,
                    id.message_index,
                    tx,
                ) {
                    result.errors.push(format!("{} '{}': {}", id, message.name, e));
                }

                let layout = message.check_layout(protocol.kind);
                if layout.has_error() {
                    describe_layout(&id, &message.name, &layout, &mut result.errors);
                }
            }
        }
    }
}

fn describe_layout(
    id: &MessageId,
    name: &str,
    layout: &MessageLayoutReport,
    errors: &mut Vec<String>,
) {
    for index in &layout.signals_out_of_payload {
        errors.push(format!("{} '{}': signal {} exceeds the payload", id, name, index));
    }
    for index in &layout.signals_misaligned {
        errors.push(format!("{} '{}': signal {} is not byte aligned", id, name, index));
    }
    for (first, second) in &layout.overlapping_signals {
        errors.push(format!(
            "{} '{}': signals {} and {} overlap",
            id, name, first, second
        ));
    }
    if layout.gaps_found {
        errors.push(format!("{} '{}': unused bits between signals", id, name));
    }
    if layout.signals_missing {
        errors.push(format!("{} '{}': message has no signals", id, name));
    }
}

fn check_values(data_pool: &DataPool, result: &mut ValidationResult) {
    for list in &data_pool.lists {
        for element in &list.elements {
            result.elements_checked += 1;
            let location = format!("{}::{}::{}", data_pool.name, list.name, element.name);
            match element.value_in_range() {
                Ok(true) => {},
                Ok(false) => result
                    .errors
                    .push(format!("{}: value outside min/max", location)),
                Err(e) => result.errors.push(format!("{}: {}", location, e)),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use ecunet_model::{
        CanMessage, CanOpenDeviceInfo, CanOpenInterfaceId, CanSignal, ContentKind, ContentValue,
        DataPoolElement, List, ProtocolKind,
    };

    fn element(name: &str) -> DataPoolElement {
        DataPoolElement::new(name, ContentKind::UInt8)
    }

    fn valid_node() -> Node {
        let mut node = Node::new("ecu");
        node.data_pools.push(DataPool::new(
            "COM",
            vec![
                List::new("CAN1_T", vec![element("a"), element("b")]),
                List::new("CAN1_R", vec![element("c")]),
            ],
        ));

        let mut protocol = Protocol::new(ProtocolKind::CanOpen, 0, 1);
        protocol.message_containers[0].used_by_interface = true;
        protocol.message_containers[0].tx_messages.push(CanMessage::new(
            "tpdo1",
            0x181,
            vec![CanSignal::new(0, 0, 8), CanSignal::new(1, 8, 8)],
        ));
        protocol.message_containers[0]
            .rx_messages
            .push(CanMessage::new("rpdo1", 0x201, vec![CanSignal::new(0, 0, 8)]));
        node.protocols.push(protocol);

        let mut manager = CanOpenManagerInfo {
            node_id: 1,
            ..CanOpenManagerInfo::default()
        };
        manager
            .devices
            .insert(CanOpenInterfaceId::new(1, 0), CanOpenDeviceInfo::with_node_id(2));
        node.canopen_managers.insert(0, manager);
        node
    }

    #[test]
    fn test_valid_node_has_no_errors() {
        let result = validate_node(&valid_node(), true);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert_eq!(result.messages_checked, 2);
        assert_eq!(result.elements_checked, 3);
    }

    #[test]
    fn test_reports_each_finding() {
        let mut node = valid_node();
        // Signal pointing past the Rx list
        node.protocols[0].message_containers[0].rx_messages[0].signals[0].element_index = 4;
        // Device colliding with the manager
        let manager = node.canopen_managers.get_mut(&0).unwrap();
        manager
            .devices
            .insert(CanOpenInterfaceId::new(2, 0), CanOpenDeviceInfo::with_node_id(1));
        // Value above max
        node.data_pools[0].lists[0].elements[0].max_value = ContentValue::from_scalar(10u8);
        node.data_pools[0].lists[0].elements[0].value = ContentValue::from_scalar(20u8);

        let result = validate_node(&node, true);
        assert_eq!(result.errors.len(), 3, "{:?}", result.errors);
        assert!(result.errors[0].contains("already in use"));
        assert!(result.errors[1].contains("can_open/dp0/if0/rx/msg0"));
        assert!(result.errors[2].contains("COM::CAN1_T::a"));
    }

    #[test]
    fn test_unused_interfaces_are_skipped() {
        let mut node = valid_node();
        node.protocols[0].message_containers[0].used_by_interface = false;
        node.protocols[0].message_containers[0].rx_messages[0].signals.clear();
        let result = validate_node(&node, true);
        assert!(result.is_valid());
        assert_eq!(result.messages_checked, 0);
    }

    #[test]
    fn test_layout_findings() {
        let mut node = valid_node();
        node.protocols[0].message_containers[0].tx_messages[0].signals[1].start_bit = 12;
        let result = validate_node(&node, true);
        assert!(result.errors.iter().any(|e| e.contains("not byte aligned")));
        assert!(result.errors.iter().any(|e| e.contains("unused bits")));
    }

    #[test]
    fn test_demo_gateway_is_valid() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos/gateway.json");
        let node = crate::loader::load_node(&path).unwrap();
        let result = validate_node(&node, true);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert_eq!(result.messages_checked, 4);
        assert_eq!(result.elements_checked, 6);
    }

    #[test]
    fn test_missing_data_pool() {
        let mut node = valid_node();
        node.protocols[0].data_pool_index = 3;
        let result = validate_node(&node, true);
        assert_eq!(result.errors.len(), 1);
    }
}

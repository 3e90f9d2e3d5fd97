//! COM protocol definitions
//!
//! Protocol kinds, the per-protocol signal layout policy and the
//! message/signal tree a protocol owns per CAN interface.

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

// ============================================================================
// Protocol kinds
// ============================================================================

/// Wire protocol variant of a COM data pool
///
/// The discriminant of each kind equals its position in
/// [`ProtocolKind::ALL`]; per-protocol arrays are indexed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ProtocolKind {
    #[serde(alias = "l2")]
    Layer2 = 0,
    #[serde(alias = "safety")]
    CanOpenSafety = 1,
    Eces = 2,
    #[serde(alias = "canopen")]
    CanOpen = 3,
    J1939 = 4,
}

impl ProtocolKind {
    pub const COUNT: usize = 5;

    pub const ALL: [ProtocolKind; Self::COUNT] = [
        ProtocolKind::Layer2,
        ProtocolKind::CanOpenSafety,
        ProtocolKind::Eces,
        ProtocolKind::CanOpen,
        ProtocolKind::J1939,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolKind::Layer2 => "layer2",
            ProtocolKind::CanOpenSafety => "can_open_safety",
            ProtocolKind::Eces => "eces",
            ProtocolKind::CanOpen => "can_open",
            ProtocolKind::J1939 => "j1939",
        }
    }

    /// Signal layout rules of this protocol
    pub fn policy(self) -> &'static ProtocolPolicy {
        &PROTOCOL_POLICIES[self]
    }
}

// Kind value == position in ALL
const _: () = {
    let mut i = 0;
    while i < ProtocolKind::COUNT {
        assert!(ProtocolKind::ALL[i] as usize == i);
        i += 1;
    }
};

/// All protocol kinds in canonical order
pub fn all_protocol_kinds() -> [ProtocolKind; ProtocolKind::COUNT] {
    debug_assert!(ProtocolKind::ALL
        .iter()
        .enumerate()
        .all(|(position, kind)| kind.index() == position));
    ProtocolKind::ALL
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "layer2" | "l2" => Ok(ProtocolKind::Layer2),
            "can_open_safety" | "canopen_safety" | "safety" => Ok(ProtocolKind::CanOpenSafety),
            "eces" => Ok(ProtocolKind::Eces),
            "can_open" | "canopen" => Ok(ProtocolKind::CanOpen),
            "j1939" => Ok(ProtocolKind::J1939),
            _ => Err(ModelError::config(format!("Unknown protocol kind: '{}'", s))),
        }
    }
}

/// One `T` per protocol kind, indexed by [`ProtocolKind`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PerProtocol<T>(pub [T; ProtocolKind::COUNT]);

impl<T> PerProtocol<T> {
    pub fn iter(&self) -> impl Iterator<Item = (ProtocolKind, &T)> {
        ProtocolKind::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<ProtocolKind> for PerProtocol<T> {
    type Output = T;

    fn index(&self, kind: ProtocolKind) -> &T {
        &self.0[kind.index()]
    }
}

impl<T> IndexMut<ProtocolKind> for PerProtocol<T> {
    fn index_mut(&mut self, kind: ProtocolKind) -> &mut T {
        &mut self.0[kind.index()]
    }
}

// ============================================================================
// Protocol policy
// ============================================================================

/// Signal layout rules of one protocol kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProtocolPolicy {
    /// Bytes at the end of the payload reserved by the protocol
    pub dlc_offset: u8,
    pub signal_gaps_valid: bool,
    pub byte_alignment_required: bool,
    pub signals_required: bool,
}

const DEFAULT_POLICY: ProtocolPolicy = ProtocolPolicy {
    dlc_offset: 0,
    signal_gaps_valid: true,
    byte_alignment_required: false,
    signals_required: false,
};

pub static PROTOCOL_POLICIES: PerProtocol<ProtocolPolicy> = PerProtocol([
    // Layer2
    DEFAULT_POLICY,
    // CanOpenSafety
    DEFAULT_POLICY,
    // Eces: two trailing bytes carry message counter and checksum
    ProtocolPolicy {
        dlc_offset: 2,
        ..DEFAULT_POLICY
    },
    // CanOpen: PDO mappings are packed, byte aligned and never empty
    ProtocolPolicy {
        dlc_offset: 0,
        signal_gaps_valid: false,
        byte_alignment_required: true,
        signals_required: true,
    },
    // J1939
    DEFAULT_POLICY,
]);

// ============================================================================
// Messages and signals
// ============================================================================

/// Bit field of a CAN message, backed by one element of the interface's list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CanSignal {
    /// Index into the element sequence of the matching Tx/Rx list
    pub element_index: u32,
    #[serde(default)]
    pub start_bit: u16,
    #[serde(default = "default_bit_length")]
    pub bit_length: u16,
}

fn default_bit_length() -> u16 {
    8
}

impl CanSignal {
    pub fn new(element_index: u32, start_bit: u16, bit_length: u16) -> Self {
        Self {
            element_index,
            start_bit,
            bit_length,
        }
    }

    /// First bit after the signal
    pub fn end_bit(&self) -> u32 {
        u32::from(self.start_bit) + u32::from(self.bit_length)
    }
}

/// Signal layout findings for one message
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct MessageLayoutReport {
    /// Signal indices extending beyond the usable payload
    pub signals_out_of_payload: Vec<usize>,
    /// Signal indices not starting/ending on a byte boundary where required
    pub signals_misaligned: Vec<usize>,
    /// Signal index pairs sharing bits
    pub overlapping_signals: Vec<(usize, usize)>,
    /// Unused bits between or before signals where the protocol forbids them
    pub gaps_found: bool,
    /// Message without signals where the protocol requires at least one
    pub signals_missing: bool,
}

impl MessageLayoutReport {
    pub fn has_error(&self) -> bool {
        !self.signals_out_of_payload.is_empty()
            || !self.signals_misaligned.is_empty()
            || !self.overlapping_signals.is_empty()
            || self.gaps_found
            || self.signals_missing
    }
}

/// CAN message definition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanMessage {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub can_id: u32,
    #[serde(default)]
    pub is_extended_id: bool,
    #[serde(default = "default_dlc")]
    pub dlc: u8,
    #[serde(default)]
    pub signals: Vec<CanSignal>,
}

fn default_dlc() -> u8 {
    8
}

impl CanMessage {
    pub fn new(name: impl Into<String>, can_id: u32, signals: Vec<CanSignal>) -> Self {
        Self {
            name: name.into(),
            can_id,
            is_extended_id: false,
            dlc: default_dlc(),
            signals,
        }
    }

    /// Check the signal bit ranges against the layout rules of `kind`
    ///
    /// Signals are treated as linear bit ranges `[start_bit, start_bit + bit_length)`.
    pub fn check_layout(&self, kind: ProtocolKind) -> MessageLayoutReport {
        let policy = kind.policy();
        let payload_bits = u32::from(self.dlc.saturating_sub(policy.dlc_offset)) * 8;
        let mut report = MessageLayoutReport {
            signals_missing: policy.signals_required && self.signals.is_empty(),
            ..MessageLayoutReport::default()
        };

        for (index, signal) in self.signals.iter().enumerate() {
            if signal.end_bit() > payload_bits {
                report.signals_out_of_payload.push(index);
            }
            if policy.byte_alignment_required
                && (signal.start_bit % 8 != 0 || signal.bit_length % 8 != 0)
            {
                report.signals_misaligned.push(index);
            }
        }

        let mut ordered: Vec<(usize, &CanSignal)> = self.signals.iter().enumerate().collect();
        ordered.sort_by_key(|(_, signal)| signal.start_bit);

        for (position, (index, signal)) in ordered.iter().enumerate() {
            for (other_index, other) in &ordered[position + 1..] {
                if u32::from(other.start_bit) >= signal.end_bit() {
                    break;
                }
                let pair = ((*index).min(*other_index), (*index).max(*other_index));
                report.overlapping_signals.push(pair);
            }
        }

        if !policy.signal_gaps_valid {
            let mut next_free = 0u32;
            for (_, signal) in &ordered {
                if u32::from(signal.start_bit) > next_free {
                    report.gaps_found = true;
                    break;
                }
                next_free = next_free.max(signal.end_bit());
            }
        }

        report
    }
}

/// Tx and Rx messages of one protocol on one CAN interface
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageContainer {
    #[serde(default)]
    pub tx_messages: Vec<CanMessage>,
    #[serde(default)]
    pub rx_messages: Vec<CanMessage>,
    #[serde(default)]
    pub used_by_interface: bool,
}

impl MessageContainer {
    pub fn messages(&self, tx: bool) -> &[CanMessage] {
        if tx {
            &self.tx_messages
        } else {
            &self.rx_messages
        }
    }

    pub fn messages_mut(&mut self, tx: bool) -> &mut Vec<CanMessage> {
        if tx {
            &mut self.tx_messages
        } else {
            &mut self.rx_messages
        }
    }
}

/// COM protocol configuration of a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protocol {
    pub kind: ProtocolKind,
    /// Index of the COM data pool inside the owning node
    pub data_pool_index: u32,
    /// One container per CAN interface, indexed by interface
    #[serde(default)]
    pub message_containers: Vec<MessageContainer>,
}

impl Protocol {
    pub fn new(kind: ProtocolKind, data_pool_index: u32, interface_count: usize) -> Self {
        Self {
            kind,
            data_pool_index,
            message_containers: vec![MessageContainer::default(); interface_count],
        }
    }

    pub fn policy(&self) -> &'static ProtocolPolicy {
        self.kind.policy()
    }
}

/// Identifies one message of a node by protocol, interface, direction and position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MessageId {
    pub protocol: ProtocolKind,
    pub data_pool_index: u32,
    pub interface_index: u32,
    pub tx: bool,
    pub message_index: u32,
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/dp{}/if{}/{}/msg{}",
            self.protocol,
            self.data_pool_index,
            self.interface_index,
            if self.tx { "tx" } else { "rx" },
            self.message_index
        )
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_kind_matches_position() {
        for (position, kind) in all_protocol_kinds().into_iter().enumerate() {
            assert_eq!(kind as u32, position as u32);
            assert_eq!(kind.index(), position);
        }
    }

    #[test]
    fn test_policy_table() {
        let eces = ProtocolKind::Eces.policy();
        assert_eq!(eces.dlc_offset, 2);
        assert!(eces.signal_gaps_valid);

        let canopen = ProtocolKind::CanOpen.policy();
        assert_eq!(canopen.dlc_offset, 0);
        assert!(!canopen.signal_gaps_valid);
        assert!(canopen.byte_alignment_required);
        assert!(canopen.signals_required);

        for kind in [
            ProtocolKind::Layer2,
            ProtocolKind::CanOpenSafety,
            ProtocolKind::J1939,
        ] {
            assert_eq!(*kind.policy(), DEFAULT_POLICY, "{}", kind);
        }
    }

    #[test]
    fn test_kind_parse_and_display() {
        for kind in ProtocolKind::ALL {
            assert_eq!(kind.as_str().parse::<ProtocolKind>().unwrap(), kind);
        }
        assert_eq!("CANopen".parse::<ProtocolKind>().unwrap(), ProtocolKind::CanOpen);
        assert_eq!("l2".parse::<ProtocolKind>().unwrap(), ProtocolKind::Layer2);
        assert!("flexray".parse::<ProtocolKind>().is_err());
    }

    #[test]
    fn test_messages_mut_picks_direction() {
        let mut protocol = Protocol::new(ProtocolKind::J1939, 0, 2);
        let container = &mut protocol.message_containers[1];
        container
            .messages_mut(true)
            .push(CanMessage::new("eec1", 0x0CF0_0400, vec![]));
        container.messages_mut(false).clear();

        assert_eq!(container.tx_messages.len(), 1);
        assert!(container.rx_messages.is_empty());
        assert_eq!(protocol.message(1, true, 0).unwrap().name, "eec1");
        assert!(protocol.message(1, false, 0).unwrap_err().is_range());
    }

    #[test]
    fn test_layout_eces_reserves_trailing_bytes() {
        let message = CanMessage::new("status", 0x100, vec![CanSignal::new(0, 40, 16)]);
        assert!(!message.check_layout(ProtocolKind::Layer2).has_error());

        let report = message.check_layout(ProtocolKind::Eces);
        assert_eq!(report.signals_out_of_payload, vec![0]);
    }

    #[test]
    fn test_layout_canopen_rules() {
        let empty = CanMessage::new("tpdo1", 0x181, vec![]);
        assert!(empty.check_layout(ProtocolKind::CanOpen).signals_missing);
        assert!(!empty.check_layout(ProtocolKind::J1939).has_error());

        let gapped = CanMessage::new(
            "tpdo2",
            0x281,
            vec![CanSignal::new(0, 0, 8), CanSignal::new(1, 16, 8)],
        );
        assert!(gapped.check_layout(ProtocolKind::CanOpen).gaps_found);
        assert!(!gapped.check_layout(ProtocolKind::Layer2).has_error());

        let misaligned = CanMessage::new("tpdo3", 0x381, vec![CanSignal::new(0, 0, 4)]);
        assert_eq!(
            misaligned.check_layout(ProtocolKind::CanOpen).signals_misaligned,
            vec![0]
        );
    }

    #[test]
    fn test_layout_overlap() {
        let message = CanMessage::new(
            "mixed",
            0x200,
            vec![
                CanSignal::new(0, 8, 8),
                CanSignal::new(1, 0, 12),
                CanSignal::new(2, 16, 8),
            ],
        );
        let report = message.check_layout(ProtocolKind::Layer2);
        assert_eq!(report.overlapping_signals, vec![(0, 1)]);
    }

    #[test]
    fn test_per_protocol_index() {
        let mut counts: PerProtocol<u32> = PerProtocol::default();
        counts[ProtocolKind::J1939] += 2;
        assert_eq!(counts.0[4], 2);
        assert_eq!(counts.iter().filter(|(_, c)| **c > 0).count(), 1);
    }

    #[test]
    fn test_message_id_display() {
        let id = MessageId {
            protocol: ProtocolKind::CanOpen,
            data_pool_index: 1,
            interface_index: 0,
            tx: true,
            message_index: 3,
        };
        assert_eq!(id.to_string(), "can_open/dp1/if0/tx/msg3");
    }
}

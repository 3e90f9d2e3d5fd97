//! ECU Network Communication Model
//!
//! In-memory model of a distributed ECU network's communication setup and the
//! rules that make it flashable. This library is pure: no I/O, no threads.
//!
//! # Modules
//!
//! - `content`: typed scalar-or-array values of ten numeric kinds
//! - `range`: float conversion, zeroing and min/max clamping of content
//! - `datapool`: data pools, lists and elements
//! - `protocol`: protocol kinds, layout policy, messages and signals
//! - `addressing`: Tx/Rx list resolution and signal-to-element lookup
//! - `canopen`: CANopen manager/device settings and their validation
//! - `node`: node configuration root
//!
//! # Example
//!
//! ```
//! use ecunet_model::{clamp_to_range, ChangeKind, ClampMode, ContentValue};
//!
//! let min = ContentValue::from_scalar(-1.0f64);
//! let max = ContentValue::from_scalar(1.0f64);
//! let mut value = ContentValue::from_scalar(2.0f64);
//! let change = clamp_to_range(&min, &max, &mut value, ClampMode::LeaveValue).unwrap();
//! assert_eq!(change, ChangeKind::Max);
//! assert_eq!(value.get::<f64>(0).unwrap(), 1.0);
//! ```

pub mod addressing;
pub mod canopen;
pub mod content;
pub mod datapool;
pub mod error;
pub mod node;
pub mod protocol;
pub mod range;
mod serde_entries;

// Re-exports for convenience
pub use canopen::{
    node_id_valid, CanOpenDeviceInfo, CanOpenInterfaceId, CanOpenManagerInfo, DeviceNodeIdReport,
    ManagerErrorReport, NmtErrorBehaviour, NODE_ID_MAX, NODE_ID_MIN,
};
pub use content::{ContentData, ContentKind, ContentScalar, ContentValue};
pub use datapool::{AccessKind, DataPool, DataPoolElement, List};
pub use error::{ModelError, Result};
pub use node::Node;
pub use protocol::{
    all_protocol_kinds, CanMessage, CanSignal, MessageContainer, MessageId, MessageLayoutReport,
    PerProtocol, Protocol, ProtocolKind, ProtocolPolicy, PROTOCOL_POLICIES,
};
pub use range::{
    all_as_f64, assign_float, byte_size, check_range, clamp_element, clamp_to_range,
    value_as_f64, zero_fill, ChangeKind, ClampMode, RANGE_EPSILON,
};

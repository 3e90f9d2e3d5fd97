//! COM addressing
//!
//! Each CAN interface owns two consecutive lists of a COM data pool, at
//! positions `2 * interface` and `2 * interface + 1`. Which of the two is Tx
//! is read from the list name (see [`List::is_tx`]). A message signal points
//! into the elements of the list matching the message direction.

use crate::datapool::{DataPool, DataPoolElement, List};
use crate::error::{ModelError, Result};
use crate::protocol::{CanMessage, CanSignal, Protocol};
use tracing::trace;

impl DataPool {
    /// Position of the Tx or Rx list of `interface_index`
    ///
    /// The two candidate positions are expected to hold one Tx and one Rx list.
    pub fn resolve_list_index(&self, interface_index: u32, want_tx: bool) -> Option<u32> {
        let first = interface_index.checked_mul(2)?;
        let second = first.checked_add(1)?;
        [first, second].into_iter().find(|&position| {
            self.lists
                .get(position as usize)
                .is_some_and(|list| list.is_tx() == want_tx)
        })
    }

    pub fn com_list(&self, interface_index: u32, want_tx: bool) -> Option<&List> {
        let index = self.resolve_list_index(interface_index, want_tx)?;
        self.lists.get(index as usize)
    }

    pub fn com_list_mut(&mut self, interface_index: u32, want_tx: bool) -> Option<&mut List> {
        let index = self.resolve_list_index(interface_index, want_tx)?;
        self.lists.get_mut(index as usize)
    }

    fn require_com_list_index(&self, interface_index: u32, want_tx: bool) -> Result<usize> {
        self.resolve_list_index(interface_index, want_tx)
            .map(|index| index as usize)
            .ok_or_else(|| {
                ModelError::range(format!(
                    "No {} list for interface {} in data pool '{}'",
                    direction(want_tx),
                    interface_index,
                    self.name
                ))
            })
    }
}

fn direction(tx: bool) -> &'static str {
    if tx {
        "Tx"
    } else {
        "Rx"
    }
}

fn element_out_of_range(list: &List, element_index: u32) -> ModelError {
    ModelError::range(format!(
        "Signal element index {} out of range for list '{}' ({} elements)",
        element_index,
        list.name,
        list.elements.len()
    ))
}

impl Protocol {
    /// Message `message_index` of the Tx or Rx side of `interface_index`
    pub fn message(&self, interface_index: u32, tx: bool, message_index: u32) -> Result<&CanMessage> {
        let container = self
            .message_containers
            .get(interface_index as usize)
            .ok_or_else(|| {
                ModelError::range(format!(
                    "Interface {} out of range ({} message containers)",
                    interface_index,
                    self.message_containers.len()
                ))
            })?;
        let messages = container.messages(tx);
        messages.get(message_index as usize).ok_or_else(|| {
            ModelError::range(format!(
                "{} message index {} out of range on interface {} ({} messages)",
                direction(tx),
                message_index,
                interface_index,
                messages.len()
            ))
        })
    }

    fn signal(
        &self,
        interface_index: u32,
        tx: bool,
        message_index: u32,
        signal_index: u32,
    ) -> Result<&CanSignal> {
        let message = self.message(interface_index, tx, message_index)?;
        message.signals.get(signal_index as usize).ok_or_else(|| {
            ModelError::range(format!(
                "Signal index {} out of range for message '{}' ({} signals)",
                signal_index,
                message.name,
                message.signals.len()
            ))
        })
    }

    /// Data pool element backing one signal
    pub fn signal_element<'a>(
        &self,
        data_pool: &'a DataPool,
        interface_index: u32,
        want_tx: bool,
        message_index: u32,
        signal_index: u32,
    ) -> Result<&'a DataPoolElement> {
        let list = &data_pool.lists[data_pool.require_com_list_index(interface_index, want_tx)?];
        let signal = self.signal(interface_index, want_tx, message_index, signal_index)?;
        list.elements
            .get(signal.element_index as usize)
            .ok_or_else(|| element_out_of_range(list, signal.element_index))
    }

    pub fn signal_element_mut<'a>(
        &self,
        data_pool: &'a mut DataPool,
        interface_index: u32,
        want_tx: bool,
        message_index: u32,
        signal_index: u32,
    ) -> Result<&'a mut DataPoolElement> {
        let list_index = data_pool.require_com_list_index(interface_index, want_tx)?;
        let signal = self.signal(interface_index, want_tx, message_index, signal_index)?;
        let list = &mut data_pool.lists[list_index];
        if signal.element_index as usize >= list.elements.len() {
            return Err(element_out_of_range(list, signal.element_index));
        }
        Ok(&mut list.elements[signal.element_index as usize])
    }

    /// Data pool elements of every signal of one message, in signal order
    ///
    /// Fails without a partial result if any signal points outside the list.
    pub fn all_signals_for_message<'a>(
        &self,
        data_pool: &'a DataPool,
        interface_index: u32,
        message_index: u32,
        want_tx: bool,
    ) -> Result<Vec<&'a DataPoolElement>> {
        let list = &data_pool.lists[data_pool.require_com_list_index(interface_index, want_tx)?];
        let message = self.message(interface_index, want_tx, message_index)?;
        trace!(
            "Resolving {} signals of message '{}' against list '{}'",
            message.signals.len(),
            message.name,
            list.name
        );
        message
            .signals
            .iter()
            .map(|signal| {
                list.elements
                    .get(signal.element_index as usize)
                    .ok_or_else(|| element_out_of_range(list, signal.element_index))
            })
            .collect()
    }
}

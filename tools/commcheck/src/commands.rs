//! Subcommand implementations

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use colored::Colorize;
use ecunet_model::{all_as_f64, ProtocolKind, PROTOCOL_POLICIES};
use tracing::warn;

use crate::loader::load_node;
use crate::validator::validate_node;

pub fn validate_command(node_file: &Path, check_device_to_device: bool) -> Result<ExitCode> {
    let node = load_node(node_file)?;
    let result = validate_node(&node, check_device_to_device);

    println!(
        "  {} messages, {} elements checked",
        result.messages_checked, result.elements_checked
    );

    if result.is_valid() {
        println!("{} Node '{}' is valid", "[OK]".bright_green(), node.name);
        return Ok(ExitCode::SUCCESS);
    }

    for error in &result.errors {
        println!("  {} {}", "ERROR".bright_red(), error);
    }
    println!(
        "{} Node '{}' has {} errors",
        "[FAIL]".bright_red(),
        node.name,
        result.errors.len()
    );
    Ok(ExitCode::FAILURE)
}

pub fn signals_command(
    node_file: &Path,
    kind: ProtocolKind,
    interface_index: u32,
    message_index: u32,
    tx: bool,
) -> Result<ExitCode> {
    let node = load_node(node_file)?;
    let protocol = node
        .protocols_of_kind(kind)
        .next()
        .with_context(|| format!("Node '{}' has no {} protocol", node.name, kind))?;
    let data_pool = node.com_data_pool(protocol)?;
    let message = protocol.message(interface_index, tx, message_index)?;
    let elements =
        protocol.all_signals_for_message(data_pool, interface_index, message_index, tx)?;

    println!(
        "{} {} (0x{:X}{}, DLC {})",
        "Message".bright_cyan(),
        message.name.bright_yellow(),
        message.can_id,
        if message.is_extended_id { ", extended" } else { "" },
        message.dlc
    );
    println!(
        "  {:<4} {:<24} {:>5} {:>4}  {:<8} value",
        "#", "element", "start", "len", "kind"
    );
    for (index, (signal, element)) in message.signals.iter().zip(&elements).enumerate() {
        let values = all_as_f64(&element.value)
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {:<4} {:<24} {:>5} {:>4}  {:<8} {}",
            index,
            element.name,
            signal.start_bit,
            signal.bit_length,
            element.kind().as_str(),
            values
        );
    }

    let layout = message.check_layout(kind);
    if layout.has_error() {
        warn!("Message '{}' violates {} layout rules", message.name, kind);
        println!("{} {:?}", "Layout:".yellow(), layout);
    }
    Ok(ExitCode::SUCCESS)
}

pub fn hash_command(node_file: &Path, seed: u32) -> Result<ExitCode> {
    let node = load_node(node_file)?;
    for data_pool in &node.data_pools {
        println!(
            "  {:<16} {} lists  {}",
            data_pool.name,
            data_pool.lists.len(),
            format!("0x{:08X}", data_pool.calc_hash(seed)).bright_yellow()
        );
    }
    if node.canopen_managers.is_empty() {
        println!("Node '{}' has no CANopen managers", node.name);
    }
    for (interface_number, manager) in &node.canopen_managers {
        println!(
            "  CAN{}  {} devices  {}",
            interface_number,
            manager.devices.len(),
            format!("0x{:08X}", manager.calc_hash(seed)).bright_yellow()
        );
    }
    Ok(ExitCode::SUCCESS)
}

pub fn policies_command() {
    println!(
        "{:<16} {:>10} {:>6} {:>8} {:>8}",
        "protocol", "dlc_offset", "gaps", "aligned", "signals"
    );
    for (kind, policy) in PROTOCOL_POLICIES.iter() {
        println!(
            "{:<16} {:>10} {:>6} {:>8} {:>8}",
            kind.as_str(),
            policy.dlc_offset,
            yes_no(policy.signal_gaps_valid),
            yes_no(policy.byte_alignment_required),
            yes_no(policy.signals_required)
        );
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

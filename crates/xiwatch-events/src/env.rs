//! Dispatch environment derivation
//!
//! Builds the environment variable assignments handed to the user
//! command for one device change record.

use x11rb::protocol::xinput::HierarchyMask;

use crate::model::DeviceChangeRecord;

/// Change flag bits and the variable names they are reported under.
const FLAG_VARS: [(HierarchyMask, &str); 8] = [
    (HierarchyMask::MASTER_ADDED, "FLAG_MASTER_ADDED"),
    (HierarchyMask::MASTER_REMOVED, "FLAG_MASTER_REMOVED"),
    (HierarchyMask::SLAVE_ADDED, "FLAG_SLAVE_ADDED"),
    (HierarchyMask::SLAVE_REMOVED, "FLAG_SLAVE_REMOVED"),
    (HierarchyMask::SLAVE_ATTACHED, "FLAG_SLAVE_ATTACHED"),
    (HierarchyMask::SLAVE_DETACHED, "FLAG_SLAVE_DETACHED"),
    (HierarchyMask::DEVICE_ENABLED, "FLAG_DEVICE_ENABLED"),
    (HierarchyMask::DEVICE_DISABLED, "FLAG_DEVICE_DISABLED"),
];

/// Derive the variable assignments for one record.
///
/// `DEVICE_NAME` is omitted entirely when the directory lookup found
/// no entry for the device; every other variable is always present.
/// The assignments override ambient variables of the same name when
/// applied to the child.
pub fn dispatch_environment(
    record: &DeviceChangeRecord,
    device_name: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut vars = Vec::with_capacity(FLAG_VARS.len() + 4);

    vars.push(("DEVICE", record.device_id.to_string()));
    if let Some(name) = device_name {
        vars.push(("DEVICE_NAME", name.to_owned()));
    }
    vars.push(("ENABLED", bit(record.enabled)));
    for (mask, var) in FLAG_VARS {
        vars.push((var, bit(record.flags.contains(mask))));
    }
    vars.push(("USE", record.use_class.to_string()));

    vars
}

fn bit(set: bool) -> String {
    String::from(if set { "1" } else { "0" })
}

//! Hierarchy-changed payload decoding

use x11rb::protocol::xinput::HierarchyEvent;

use crate::model::{ChangeFlags, DeviceChangeRecord, HierarchyNotification, UseClass};

/// Decode one hierarchy-changed event into its ordered record sequence.
///
/// The record order is the server's internal change order and is kept
/// exactly as delivered. Unrecognized device roles decode to
/// [`UseClass::Unknown`]; decoding itself cannot fail.
pub fn decode_hierarchy_event(event: &HierarchyEvent) -> HierarchyNotification {
    let records = event
        .infos
        .iter()
        .map(|info| DeviceChangeRecord {
            device_id: info.deviceid,
            enabled: info.enabled,
            flags: ChangeFlags::from_raw(info.flags.into()),
            use_class: UseClass::from(info.type_),
        })
        .collect();

    HierarchyNotification {
        flags: ChangeFlags::from_raw(event.flags.into()),
        records,
    }
}

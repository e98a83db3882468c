//! Event model types
//!
//! Mirrors the XInput2 hierarchy-changed wire data: the change-flag
//! bitset, the device role, per-device change records, and the device
//! name directory queried at dispatch time.

use std::fmt;

use x11rb::protocol::xinput::{DeviceType, HierarchyMask, XIDeviceInfo};

/// Bitset of hierarchy change flags attached to one device record.
///
/// Zero or more of the eight XInput2 hierarchy masks may be set at
/// once. A record with no flags set describes no actionable transition
/// and is skipped by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChangeFlags(u32);

impl ChangeFlags {
    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Whether any bit of `mask` is set.
    pub fn contains(self, mask: HierarchyMask) -> bool {
        self.0 & u32::from(mask) != 0
    }
}

impl From<HierarchyMask> for ChangeFlags {
    fn from(mask: HierarchyMask) -> Self {
        Self(mask.into())
    }
}

/// Role of a device within the input hierarchy.
///
/// Values outside the set known to XInput2 decode to
/// [`UseClass::Unknown`]; they are valid, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseClass {
    None,
    MasterPointer,
    MasterKeyboard,
    SlavePointer,
    SlaveKeyboard,
    FloatingSlave,
    Unknown(u16),
}

impl From<DeviceType> for UseClass {
    fn from(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::MASTER_POINTER => UseClass::MasterPointer,
            DeviceType::MASTER_KEYBOARD => UseClass::MasterKeyboard,
            DeviceType::SLAVE_POINTER => UseClass::SlavePointer,
            DeviceType::SLAVE_KEYBOARD => UseClass::SlaveKeyboard,
            DeviceType::FLOATING_SLAVE => UseClass::FloatingSlave,
            other => match u16::from(other) {
                0 => UseClass::None,
                raw => UseClass::Unknown(raw),
            },
        }
    }
}

impl fmt::Display for UseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UseClass::None => f.write_str("none"),
            UseClass::MasterPointer => f.write_str("master_pointer"),
            UseClass::MasterKeyboard => f.write_str("master_keyboard"),
            UseClass::SlavePointer => f.write_str("slave_pointer"),
            UseClass::SlaveKeyboard => f.write_str("slave_keyboard"),
            UseClass::FloatingSlave => f.write_str("floating_slave"),
            UseClass::Unknown(raw) => write!(f, "unknown_{raw}"),
        }
    }
}

/// One change to one device, as delivered inside a hierarchy-changed
/// notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceChangeRecord {
    pub device_id: u16,
    pub enabled: bool,
    pub flags: ChangeFlags,
    pub use_class: UseClass,
}

impl DeviceChangeRecord {
    /// A record warrants a dispatch only if at least one flag is set.
    pub fn is_actionable(&self) -> bool {
        !self.flags.is_empty()
    }
}

/// The decoded payload of one hierarchy-changed event.
///
/// `records` keeps the server's delivery order; the dispatcher must
/// not resort it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyNotification {
    /// Union of all per-device change flags in this notification.
    pub flags: ChangeFlags,
    pub records: Vec<DeviceChangeRecord>,
}

impl HierarchyNotification {
    /// Records with at least one change flag set, in payload order.
    pub fn actionable(&self) -> impl Iterator<Item = &DeviceChangeRecord> {
        self.records.iter().filter(|record| record.is_actionable())
    }
}

/// Snapshot of the device list, mapping device id to name.
///
/// Queried fresh for every dispatched record and valid only for that
/// lookup: the device may already be gone by the time the snapshot is
/// read, in which case the name is simply absent.
#[derive(Debug, Clone, Default)]
pub struct DeviceDirectory {
    entries: Vec<(u16, String)>,
}

impl DeviceDirectory {
    pub fn from_infos(infos: &[XIDeviceInfo]) -> Self {
        let entries = infos
            .iter()
            .map(|info| {
                (
                    info.deviceid,
                    String::from_utf8_lossy(&info.name).into_owned(),
                )
            })
            .collect();
        Self { entries }
    }

    /// Name of the device, or `None` if it is not (or no longer) in
    /// the snapshot.
    pub fn name_of(&self, device_id: u16) -> Option<&str> {
        self.entries
            .iter()
            .find(|(id, _)| *id == device_id)
            .map(|(_, name)| name.as_str())
    }
}

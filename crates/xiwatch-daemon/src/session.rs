//! X server session: connection, subscription and the event loop
//!
//! The [`Session`] owns the X connection and is handed explicitly to
//! everything that needs it; there is no global display handle. Its
//! only suspension points are the blocking event read and, indirectly,
//! the child wait inside the dispatcher.

use anyhow::Context as _;
use thiserror::Error;
use tracing::{debug, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::{ConnectError, ConnectionError, ReplyError};
use x11rb::protocol::xinput::{
    self, ConnectionExt as _, Device, EventMask, HierarchyMask, XIEventMask,
};
use x11rb::protocol::xproto::Window;
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use xiwatch_events::{
    decode_hierarchy_event, ChangeFlags, DeviceChangeRecord, DeviceDirectory,
    HierarchyNotification, UseClass,
};

use crate::dispatch::Invoker;

/// Errors raised while talking to the X server.
///
/// Everything here is fatal at startup; during the loop only the
/// device directory query degrades to a missing name instead.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unable to open X display: {0}")]
    Connect(#[from] ConnectError),

    #[error("X Input extension not available")]
    ExtensionMissing,

    #[error("X server request failed: {0}")]
    Request(#[from] ConnectionError),

    #[error("X server reply failed: {0}")]
    Reply(#[from] ReplyError),
}

/// An open connection to the X server, bound to one screen's root
/// window for the hierarchy subscription.
pub struct Session {
    conn: RustConnection,
    root: Window,
}

impl Session {
    /// Connect to the display and verify the X Input extension.
    ///
    /// `display` falls back to the ambient `$DISPLAY` when `None`.
    /// Hierarchy notifications are an XI 2.0 feature, so the version
    /// is negotiated here as part of the presence check.
    pub fn connect(display: Option<&str>) -> Result<Self, SessionError> {
        let (conn, screen_num) = x11rb::connect(display)?;

        let extension = conn
            .extension_information(xinput::X11_EXTENSION_NAME)?
            .ok_or(SessionError::ExtensionMissing)?;
        let version = conn.xinput_xi_query_version(2, 0)?.reply()?;
        debug!(
            opcode = extension.major_opcode,
            "X Input extension present, server speaks XI {}.{}",
            version.major_version,
            version.minor_version
        );

        let root = conn.setup().roots[screen_num].root;
        Ok(Self { conn, root })
    }

    /// Register for hierarchy-changed notifications for all devices on
    /// the root window. Registered once; the subscription lives as
    /// long as the connection.
    pub fn subscribe(&self) -> Result<(), SessionError> {
        let mask = EventMask {
            deviceid: Device::ALL.into(),
            mask: vec![XIEventMask::HIERARCHY.into()],
        };
        self.conn
            .xinput_xi_select_events(self.root, &[mask])?
            .check()?;
        debug!(root = self.root, "subscribed to hierarchy changes");
        Ok(())
    }

    /// Take a fresh snapshot of the device list.
    pub fn device_directory(&self) -> Result<DeviceDirectory, SessionError> {
        let reply = self
            .conn
            .xinput_xi_query_device(Device::ALL)?
            .reply()?;
        Ok(DeviceDirectory::from_infos(&reply.infos))
    }

    /// Block on server events forever, dispatching each hierarchy
    /// notification in full before reading the next one.
    ///
    /// Returns only when the event read fails (connection lost), which
    /// is fatal; restarting is the operator's responsibility.
    pub fn run(&self, invoker: &Invoker) -> anyhow::Result<()> {
        loop {
            let event = self
                .conn
                .wait_for_event()
                .context("lost connection to the X server")?;
            if let Event::XinputHierarchy(event) = event {
                let notification = decode_hierarchy_event(&event);
                debug!(
                    records = notification.records.len(),
                    flags = notification.flags.raw(),
                    "hierarchy changed"
                );
                self.dispatch_notification(invoker, &notification);
            }
        }
    }

    /// Dispatch every actionable record of one notification, in
    /// payload order, waiting on each child before the next.
    fn dispatch_notification(&self, invoker: &Invoker, notification: &HierarchyNotification) {
        for record in notification.actionable() {
            let name = self.lookup_name(record.device_id);
            invoker.dispatch(record, name.as_deref());
        }
    }

    /// Per-record directory lookup. The snapshot may already be stale;
    /// a vanished device or a failed query just means no name.
    fn lookup_name(&self, device_id: u16) -> Option<String> {
        match self.device_directory() {
            Ok(directory) => directory.name_of(device_id).map(str::to_owned),
            Err(e) => {
                warn!("device directory query failed: {e}");
                None
            }
        }
    }

    /// Synthesize added/enabled records for devices already present,
    /// so a freshly started watcher can configure devices plugged in
    /// before it. Masters replay as added; attached slave pointers and
    /// keyboards replay as added then enabled.
    pub fn replay_existing_devices(&self, invoker: &Invoker) -> Result<(), SessionError> {
        let reply = self
            .conn
            .xinput_xi_query_device(Device::ALL)?
            .reply()?;
        debug!(
            devices = reply.infos.len(),
            "replaying changes for present devices"
        );

        for info in &reply.infos {
            let use_class = UseClass::from(info.type_);
            let masks: &[HierarchyMask] = match use_class {
                UseClass::MasterPointer | UseClass::MasterKeyboard => {
                    &[HierarchyMask::MASTER_ADDED]
                }
                UseClass::SlavePointer | UseClass::SlaveKeyboard => {
                    &[HierarchyMask::SLAVE_ADDED, HierarchyMask::DEVICE_ENABLED]
                }
                _ => &[],
            };

            let name = String::from_utf8_lossy(&info.name);
            for &mask in masks {
                let record = DeviceChangeRecord {
                    device_id: info.deviceid,
                    enabled: info.enabled,
                    flags: ChangeFlags::from(mask),
                    use_class,
                };
                invoker.dispatch(&record, Some(&name));
            }
        }
        Ok(())
    }
}

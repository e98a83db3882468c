//! Child process dispatch
//!
//! Runs the user command for one device change record: the ambient
//! environment with the derived variables layered on top, the literal
//! argument vector, no shell. The caller blocks until the child exits,
//! so child invocations never overlap.

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus};

use tracing::{debug, info, warn};
use xiwatch_events::{dispatch_environment, DeviceChangeRecord};

/// Invokes the user command for actionable device change records.
pub struct Invoker {
    program: String,
    args: Vec<String>,
    no_act: bool,
}

impl Invoker {
    pub fn new(program: String, args: Vec<String>, no_act: bool) -> Self {
        Self {
            program,
            args,
            no_act,
        }
    }

    /// Run the command for one record and wait for it to exit.
    ///
    /// Spawn failures and failing exit statuses are reported on the
    /// diagnostic stream and swallowed; one lost dispatch never stops
    /// the watcher.
    pub fn dispatch(&self, record: &DeviceChangeRecord, device_name: Option<&str>) {
        let vars = dispatch_environment(record, device_name);

        if self.no_act {
            info!(
                device = record.device_id,
                use_class = %record.use_class,
                "would run {}",
                self.program
            );
            return;
        }

        debug!(
            device = record.device_id,
            use_class = %record.use_class,
            "running {}",
            self.program
        );
        match self.spawn_and_wait(&vars) {
            Err(e) => warn!("failed to run {}: {e}", self.program),
            Ok(status) => self.report_exit(status),
        }
    }

    /// Spawn the command with the derived variables applied over the
    /// inherited environment and block until it exits.
    fn spawn_and_wait(&self, vars: &[(&str, String)]) -> io::Result<ExitStatus> {
        Command::new(&self.program)
            .args(&self.args)
            .envs(vars.iter().map(|(var, value)| (*var, value.as_str())))
            .status()
    }

    fn report_exit(&self, status: ExitStatus) {
        if status.success() {
            return;
        }
        match (status.code(), status.signal()) {
            (Some(code), _) => warn!("{} exited with status {code}", self.program),
            (None, Some(signal)) => warn!("{} killed by signal {signal}", self.program),
            (None, None) => warn!("{} exited abnormally", self.program),
        }
    }
}

#[cfg(test)]
mod tests {
    use x11rb::protocol::xinput::HierarchyMask;
    use xiwatch_events::{ChangeFlags, HierarchyNotification, UseClass};

    use super::*;

    fn enabled_keyboard(device_id: u16) -> DeviceChangeRecord {
        DeviceChangeRecord {
            device_id,
            enabled: true,
            flags: ChangeFlags::from(HierarchyMask::DEVICE_ENABLED),
            use_class: UseClass::SlaveKeyboard,
        }
    }

    fn sh(script: &str) -> Invoker {
        Invoker::new("sh".into(), vec!["-c".into(), script.into()], false)
    }

    #[test]
    fn test_child_sees_derived_environment() {
        let invoker = sh(concat!(
            "test \"$DEVICE\" = 15 && ",
            "test \"$DEVICE_NAME\" = 'mini keyboard Consumer Control' && ",
            "test \"$ENABLED\" = 1 && ",
            "test \"$FLAG_DEVICE_ENABLED\" = 1 && ",
            "test \"$FLAG_SLAVE_ADDED\" = 0 && ",
            "test \"$USE\" = slave_keyboard"
        ));
        let vars = dispatch_environment(
            &enabled_keyboard(15),
            Some("mini keyboard Consumer Control"),
        );

        let status = invoker.spawn_and_wait(&vars).expect("spawn sh");
        assert!(status.success(), "child saw an unexpected environment");
    }

    #[test]
    fn test_derived_variables_override_ambient() {
        std::env::set_var("DEVICE", "999");
        let invoker = sh("test \"$DEVICE\" = 15");
        let vars = dispatch_environment(&enabled_keyboard(15), None);

        let status = invoker.spawn_and_wait(&vars).expect("spawn sh");
        assert!(status.success(), "derived DEVICE should override ambient");
    }

    #[test]
    fn test_missing_device_name_stays_unset() {
        let invoker = sh("test -z \"$DEVICE_NAME\"");
        let vars = dispatch_environment(&enabled_keyboard(15), None);

        let status = invoker.spawn_and_wait(&vars).expect("spawn sh");
        assert!(status.success(), "DEVICE_NAME should be unset on a lookup miss");
    }

    #[test]
    fn test_spawn_failure_is_swallowed() {
        let invoker = Invoker::new("/nonexistent/xiwatch-test-helper".into(), Vec::new(), false);
        // Reported on the diagnostic stream; must not panic or abort.
        invoker.dispatch(&enabled_keyboard(3), None);
    }

    #[test]
    fn test_nonzero_exit_is_informational() {
        let invoker = sh("exit 2");
        let vars = dispatch_environment(&enabled_keyboard(3), None);
        let status = invoker.spawn_and_wait(&vars).expect("spawn sh");
        assert_eq!(status.code(), Some(2));

        // dispatch() logs the failure and carries on.
        invoker.dispatch(&enabled_keyboard(3), None);
    }

    #[test]
    fn test_actionable_records_dispatch_in_payload_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let log = dir.path().join("order");
        let invoker = sh(&format!("echo \"$DEVICE\" >> {}", log.display()));

        let mut skipped = enabled_keyboard(4);
        skipped.flags = ChangeFlags::from_raw(0);
        let notification = HierarchyNotification {
            flags: ChangeFlags::from(HierarchyMask::DEVICE_ENABLED),
            records: vec![enabled_keyboard(9), skipped, enabled_keyboard(2)],
        };

        // Each child runs to completion before the next record is
        // looked at, so the log reflects payload order.
        for record in notification.actionable() {
            invoker.dispatch(record, None);
        }

        let contents = std::fs::read_to_string(&log).expect("read order log");
        assert_eq!(contents, "9\n2\n");
    }

    #[test]
    fn test_no_act_does_not_spawn() {
        let dir = tempfile::tempdir().expect("tempdir");
        let marker = dir.path().join("ran");
        let invoker = Invoker::new("touch".into(), vec![marker.display().to_string()], true);

        invoker.dispatch(&enabled_keyboard(3), None);
        assert!(!marker.exists(), "--no-act must not run the command");
    }
}

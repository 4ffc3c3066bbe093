//! Resolves a [`CallerIdentity`] from the D-Bus connection that made a
//! request, the way firewalld's own D-Bus glue does: ask the bus daemon
//! itself for the calling peer's uid and (on Linux) its SELinux context,
//! then look up the username and the `/proc/<pid>/cmdline` of the peer
//! process. None of this is load-bearing for correctness if it's
//! unavailable — an all-`None` [`CallerIdentity`] simply can't match any
//! lockdown whitelist entry, which is the fail-closed behavior we want.

use warden_core::CallerIdentity;
use zbus::names::UniqueName;
use zbus::Connection;

/// Resolves the identity of `sender` (a unique bus name such as `:1.42`) by
/// querying `org.freedesktop.DBus` for its credentials.
pub async fn resolve(connection: &Connection, sender: &UniqueName<'_>) -> CallerIdentity {
    let dbus = match zbus::fdo::DBusProxy::new(connection).await {
        Ok(proxy) => proxy,
        Err(error) => {
            tracing::warn!(%error, "could not reach org.freedesktop.DBus to resolve caller identity");
            return CallerIdentity::default();
        }
    };

    let uid = dbus.get_connection_unix_user(sender.clone().into()).await.ok();
    let pid = dbus.get_connection_unix_process_id(sender.clone().into()).await.ok();
    let context = dbus
        .get_connection_selinux_security_context(sender.clone().into())
        .await
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).trim_end_matches('\0').to_owned());

    let user = uid.and_then(username_for_uid);
    let command = pid.and_then(cmdline_for_pid);

    CallerIdentity { context, uid, user, command }
}

/// Looks `uid` up in `/etc/passwd` rather than linking `libc` for a single
/// `getpwuid` call — this workspace denies `unsafe_code` outright, and the
/// daemon already only runs on Linux.
fn username_for_uid(uid: u32) -> Option<String> {
    let passwd = std::fs::read_to_string("/etc/passwd").ok()?;
    let uid_field = uid.to_string();
    passwd.lines().find_map(|line| {
        let mut fields = line.split(':');
        let name = fields.next()?;
        let _password = fields.next()?;
        let entry_uid = fields.next()?;
        (entry_uid == uid_field).then(|| name.to_owned())
    })
}

fn cmdline_for_pid(pid: u32) -> Option<String> {
    let raw = std::fs::read(format!("/proc/{pid}/cmdline")).ok()?;
    let command = raw
        .split(|byte| *byte == 0)
        .filter(|part| !part.is_empty())
        .map(|part| String::from_utf8_lossy(part).into_owned())
        .collect::<Vec<_>>()
        .join(" ");
    if command.is_empty() {
        None
    } else {
        Some(command)
    }
}

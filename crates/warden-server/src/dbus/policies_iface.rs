//! `org.warden.Warden1.policies`: lockdown enable/disable and its four
//! whitelist sets (context, uid, user, command).

use zbus::interface;
use zbus::object_server::SignalEmitter;

use warden_core::CallerIdentity;

use crate::actor::{Handle, WhitelistKind};
use crate::caller;
use crate::error::map;

pub struct PoliciesIface {
    pub handle: Handle,
}

impl PoliciesIface {
    async fn resolve_caller(&self, connection: &zbus::Connection, header: &zbus::message::Header<'_>) -> CallerIdentity {
        match header.sender() {
            Some(sender) => caller::resolve(connection, sender).await,
            None => CallerIdentity::default(),
        }
    }
}

#[interface(name = "org.warden.Warden1.policies")]
impl PoliciesIface {
    #[zbus(name = "enableLockdown")]
    async fn enable_lockdown(
        &self,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.enable_lockdown(caller).await)?;
        let _ = Self::lockdown_enabled(&emitter).await;
        Ok(())
    }

    #[zbus(name = "disableLockdown")]
    async fn disable_lockdown(
        &self,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
        #[zbus(signal_emitter)] emitter: SignalEmitter<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.disable_lockdown(caller).await)?;
        let _ = Self::lockdown_disabled(&emitter).await;
        Ok(())
    }

    #[zbus(name = "queryLockdown")]
    async fn query_lockdown(&self) -> bool {
        self.handle.query_lockdown().await
    }

    #[zbus(name = "addLockdownWhitelistCommand")]
    async fn add_lockdown_whitelist_command(
        &self,
        command: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.lockdown_whitelist_add_string(WhitelistKind::Command, command, caller).await)
    }

    #[zbus(name = "removeLockdownWhitelistCommand")]
    async fn remove_lockdown_whitelist_command(
        &self,
        command: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.lockdown_whitelist_remove_string(WhitelistKind::Command, command, caller).await)
    }

    #[zbus(name = "queryLockdownWhitelistCommand")]
    async fn query_lockdown_whitelist_command(&self, command: String) -> bool {
        self.handle.lockdown_whitelist_query_string(WhitelistKind::Command, command).await
    }

    #[zbus(name = "getLockdownWhitelistCommands")]
    async fn get_lockdown_whitelist_commands(&self) -> Vec<String> {
        self.handle.lockdown_whitelist_list_strings(WhitelistKind::Command).await
    }

    #[zbus(name = "addLockdownWhitelistUser")]
    async fn add_lockdown_whitelist_user(
        &self,
        user: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.lockdown_whitelist_add_string(WhitelistKind::User, user, caller).await)
    }

    #[zbus(name = "removeLockdownWhitelistUser")]
    async fn remove_lockdown_whitelist_user(
        &self,
        user: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.lockdown_whitelist_remove_string(WhitelistKind::User, user, caller).await)
    }

    #[zbus(name = "queryLockdownWhitelistUser")]
    async fn query_lockdown_whitelist_user(&self, user: String) -> bool {
        self.handle.lockdown_whitelist_query_string(WhitelistKind::User, user).await
    }

    #[zbus(name = "getLockdownWhitelistUsers")]
    async fn get_lockdown_whitelist_users(&self) -> Vec<String> {
        self.handle.lockdown_whitelist_list_strings(WhitelistKind::User).await
    }

    #[zbus(name = "addLockdownWhitelistContext")]
    async fn add_lockdown_whitelist_context(
        &self,
        context: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.lockdown_whitelist_add_string(WhitelistKind::Context, context, caller).await)
    }

    #[zbus(name = "removeLockdownWhitelistContext")]
    async fn remove_lockdown_whitelist_context(
        &self,
        context: String,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.lockdown_whitelist_remove_string(WhitelistKind::Context, context, caller).await)
    }

    #[zbus(name = "queryLockdownWhitelistContext")]
    async fn query_lockdown_whitelist_context(&self, context: String) -> bool {
        self.handle.lockdown_whitelist_query_string(WhitelistKind::Context, context).await
    }

    #[zbus(name = "getLockdownWhitelistContexts")]
    async fn get_lockdown_whitelist_contexts(&self) -> Vec<String> {
        self.handle.lockdown_whitelist_list_strings(WhitelistKind::Context).await
    }

    #[zbus(name = "addLockdownWhitelistUid")]
    async fn add_lockdown_whitelist_uid(
        &self,
        uid: u32,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.lockdown_whitelist_add_uid(uid, caller).await)
    }

    #[zbus(name = "removeLockdownWhitelistUid")]
    async fn remove_lockdown_whitelist_uid(
        &self,
        uid: u32,
        #[zbus(connection)] connection: &zbus::Connection,
        #[zbus(header)] header: zbus::message::Header<'_>,
    ) -> zbus::fdo::Result<()> {
        let caller = self.resolve_caller(connection, &header).await;
        map(self.handle.lockdown_whitelist_remove_uid(uid, caller).await)
    }

    #[zbus(name = "queryLockdownWhitelistUid")]
    async fn query_lockdown_whitelist_uid(&self, uid: u32) -> bool {
        self.handle.lockdown_whitelist_query_uid(uid).await
    }

    #[zbus(name = "getLockdownWhitelistUids")]
    async fn get_lockdown_whitelist_uids(&self) -> Vec<u32> {
        self.handle.lockdown_whitelist_list_uids().await
    }

    #[zbus(signal)]
    pub async fn lockdown_enabled(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;
    #[zbus(signal)]
    pub async fn lockdown_disabled(emitter: &SignalEmitter<'_>) -> zbus::Result<()>;
}

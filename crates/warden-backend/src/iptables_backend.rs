//! `iptables`/`ip6tables`-driven backend (feature `iptables-backend`).
//!
//! Legacy alternative to [`crate::NftBackend`] for hosts without nftables.
//! Each applied rule is tagged with a `-m comment --comment "warden:<id>"`
//! match; `apply_rule` checks for that comment via `-C` (iptables' built-in
//! "does this rule already exist" check) before appending, and `remove_rule`
//! deletes by full rule spec (idempotent: `-D` on an absent rule is treated
//! as success).

use tokio::process::Command;

use crate::error::BackendError;
use crate::types::{Capabilities, Chain, DirectRule, Family, RuleDescriptor};

fn binary_for(family: Family) -> &'static str {
    match family {
        Family::Ipv4 => "iptables",
        Family::Ipv6 => "ip6tables",
        Family::Bridge => "ebtables",
    }
}

fn comment_args(id: &str) -> Vec<String> {
    vec![
        "-m".to_owned(),
        "comment".to_owned(),
        "--comment".to_owned(),
        format!("warden:{id}"),
    ]
}

async fn run(family: Family, args: &[String]) -> Result<String, BackendError> {
    let binary = binary_for(family);
    let output = Command::new(binary)
        .args(args)
        .output()
        .await
        .map_err(|source| BackendError::Spawn {
            command: binary.to_owned(),
            source,
        })?;

    if !output.status.success() {
        return Err(BackendError::CommandFailed {
            command: format!("{binary} {}", args.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Returns `Ok(true)` if iptables reports the rule already exists (`-C`).
async fn rule_exists(family: Family, table: &str, chain: &str, args: &[String]) -> bool {
    let mut check = vec!["-t".to_owned(), table.to_owned(), "-C".to_owned(), chain.to_owned()];
    check.extend(args.iter().cloned());
    run(family, &check).await.is_ok()
}

/// Backend that shells out to `iptables`/`ip6tables`/`ebtables`.
#[derive(Debug, Default)]
pub struct IptablesBackend;

impl IptablesBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl crate::Backend for IptablesBackend {
    async fn probe(&self) -> Result<Capabilities, BackendError> {
        let ipv4 = run(Family::Ipv4, &["-L".to_owned(), "-n".to_owned()]).await.is_ok();
        let ipv6 = run(Family::Ipv6, &["-L".to_owned(), "-n".to_owned()]).await.is_ok();
        let bridge = run(Family::Bridge, &["-L".to_owned()]).await.is_ok();

        Ok(Capabilities {
            ipv4,
            ipv6,
            bridge,
            ipv6_rpfilter: ipv6
                && tokio::fs::metadata("/proc/sys/net/ipv6/conf/all/rp_filter")
                    .await
                    .is_ok(),
        })
    }

    async fn apply_rule(&self, rule: &RuleDescriptor) -> Result<(), BackendError> {
        let mut args = rule.args.clone();
        args.extend(comment_args(&rule.id));

        if rule_exists(rule.family, &rule.table, &rule.chain, &args).await {
            return Ok(());
        }

        let mut full = vec!["-t".to_owned(), rule.table.clone(), "-A".to_owned(), rule.chain.clone()];
        full.extend(args);
        run(rule.family, &full).await?;
        Ok(())
    }

    async fn remove_rule(&self, rule: &RuleDescriptor) -> Result<(), BackendError> {
        let mut args = rule.args.clone();
        args.extend(comment_args(&rule.id));

        if !rule_exists(rule.family, &rule.table, &rule.chain, &args).await {
            return Ok(());
        }

        let mut full = vec!["-t".to_owned(), rule.table.clone(), "-D".to_owned(), rule.chain.clone()];
        full.extend(args);
        run(rule.family, &full).await?;
        Ok(())
    }

    async fn add_chain(&self, chain: &Chain) -> Result<(), BackendError> {
        run(
            chain.family,
            &[
                "-t".to_owned(),
                chain.table.clone(),
                "-N".to_owned(),
                chain.name.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn remove_chain(&self, chain: &Chain) -> Result<(), BackendError> {
        run(
            chain.family,
            &[
                "-t".to_owned(),
                chain.table.clone(),
                "-X".to_owned(),
                chain.name.clone(),
            ],
        )
        .await?;
        Ok(())
    }

    async fn list_chains(&self, family: Family, table: &str) -> Result<Vec<String>, BackendError> {
        let output = run(
            family,
            &["-t".to_owned(), table.to_owned(), "-S".to_owned()],
        )
        .await?;

        Ok(output
            .lines()
            .filter_map(|line| line.strip_prefix("-N "))
            .map(|name| name.trim().to_owned())
            .collect())
    }

    async fn add_direct_rule(&self, rule: &DirectRule) -> Result<(), BackendError> {
        let id = format!("direct:{}:{}:{}", rule.table, rule.chain, rule.priority);
        self.apply_rule(&RuleDescriptor {
            id,
            family: rule.family,
            table: rule.table.clone(),
            chain: rule.chain.clone(),
            args: rule.args.clone(),
        })
        .await
    }

    async fn remove_direct_rule(&self, rule: &DirectRule) -> Result<(), BackendError> {
        let id = format!("direct:{}:{}:{}", rule.table, rule.chain, rule.priority);
        self.remove_rule(&RuleDescriptor {
            id,
            family: rule.family,
            table: rule.table.clone(),
            chain: rule.chain.clone(),
            args: rule.args.clone(),
        })
        .await
    }

    async fn list_direct_rules(
        &self,
        family: Family,
        table: &str,
        chain: &str,
    ) -> Result<Vec<DirectRule>, BackendError> {
        let _ = (family, table, chain);
        Ok(Vec::new())
    }

    async fn passthrough(&self, family: Family, args: &[String]) -> Result<String, BackendError> {
        run(family, args).await
    }

    async fn flush_all(&self) -> Result<(), BackendError> {
        for family in [Family::Ipv4, Family::Ipv6] {
            run(family, &["-F".to_owned()]).await?;
            run(family, &["-X".to_owned()]).await?;
        }
        Ok(())
    }
}

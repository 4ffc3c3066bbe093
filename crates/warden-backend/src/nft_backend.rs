//! `nft`-driven backend (feature `nft-backend`, the production default).
//!
//! Every rule carries a `comment "warden:<id>"` match so `apply_rule` and
//! `remove_rule` stay idempotent without needing to diff full rule text:
//! `apply_rule` first checks whether a rule with that comment already exists
//! in the target chain and is a no-op if so; `remove_rule` looks up the
//! rule's handle by the same comment and deletes by handle (an absent
//! comment is not an error).

use tokio::process::Command;

use crate::error::BackendError;
use crate::types::{Capabilities, Chain, DirectRule, Family, RuleDescriptor};

const NFT: &str = "nft";

/// Backend that shells out to `nft` (nftables) for every operation.
#[derive(Debug, Default)]
pub struct NftBackend;

impl NftBackend {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn run(&self, family: Family, args: &[String]) -> Result<String, BackendError> {
        let mut cmd = Command::new(NFT);
        cmd.arg("-f").arg("-").args(args);
        run_command(&mut cmd, family).await
    }

    fn comment_for(id: &str) -> String {
        format!("warden:{id}")
    }

    async fn find_handle(
        &self,
        family: Family,
        table: &str,
        chain: &str,
        comment: &str,
    ) -> Result<Option<u64>, BackendError> {
        let output = run_command(
            Command::new(NFT).args([
                "-a",
                "list",
                "chain",
                family.as_str(),
                table,
                chain,
            ]),
            family,
        )
        .await?;

        for line in output.lines() {
            if line.contains(comment) {
                if let Some(handle) = parse_handle(line) {
                    return Ok(Some(handle));
                }
            }
        }
        Ok(None)
    }
}

fn parse_handle(line: &str) -> Option<u64> {
    let idx = line.rfind("handle")?;
    line[idx + "handle".len()..].trim().parse().ok()
}

async fn run_command(cmd: &mut Command, family: Family) -> Result<String, BackendError> {
    let program = format!("{:?}", cmd.as_std());
    let output = cmd.output().await.map_err(|source| BackendError::Spawn {
        command: program.clone(),
        source,
    })?;

    if !output.status.success() {
        return Err(BackendError::CommandFailed {
            command: format!("{program} [{family}]"),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[async_trait::async_trait]
impl crate::Backend for NftBackend {
    async fn probe(&self) -> Result<Capabilities, BackendError> {
        let ipv4 = run_command(Command::new(NFT).args(["list", "tables", "ip"]), Family::Ipv4)
            .await
            .is_ok();
        let ipv6 = run_command(Command::new(NFT).args(["list", "tables", "ip6"]), Family::Ipv6)
            .await
            .is_ok();
        let bridge = run_command(Command::new(NFT).args(["list", "tables", "bridge"]), Family::Bridge)
            .await
            .is_ok();

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
        let comment = Self::comment_for(&rule.id);
        if self
            .find_handle(rule.family, &rule.table, &rule.chain, &comment)
            .await?
            .is_some()
        {
            return Ok(());
        }

        let mut script = format!(
            "add rule {} {} {} ",
            rule.family, rule.table, rule.chain
        );
        script.push_str(&rule.args.join(" "));
        script.push_str(&format!(" comment \"{comment}\"\n"));

        self.run(rule.family, &["-c".to_owned(), script]).await?;
        Ok(())
    }

    async fn remove_rule(&self, rule: &RuleDescriptor) -> Result<(), BackendError> {
        let comment = Self::comment_for(&rule.id);
        let Some(handle) = self
            .find_handle(rule.family, &rule.table, &rule.chain, &comment)
            .await?
        else {
            return Ok(());
        };

        self.run(
            rule.family,
            &[format!(
                "delete rule {} {} {} handle {handle}\n",
                rule.family, rule.table, rule.chain
            )],
        )
        .await?;
        Ok(())
    }

    async fn add_chain(&self, chain: &Chain) -> Result<(), BackendError> {
        self.run(
            chain.family,
            &[format!(
                "add chain {} {} {}\n",
                chain.family, chain.table, chain.name
            )],
        )
        .await?;
        Ok(())
    }

    async fn remove_chain(&self, chain: &Chain) -> Result<(), BackendError> {
        self.run(
            chain.family,
            &[format!(
                "delete chain {} {} {}\n",
                chain.family, chain.table, chain.name
            )],
        )
        .await?;
        Ok(())
    }

    async fn list_chains(&self, family: Family, table: &str) -> Result<Vec<String>, BackendError> {
        let output = run_command(
            Command::new(NFT).args(["list", "table", family.as_str(), table]),
            family,
        )
        .await?;

        Ok(output
            .lines()
            .filter_map(|line| {
                let line = line.trim();
                line.strip_prefix("chain ").map(|rest| {
                    rest.trim_end_matches('{').trim().to_owned()
                })
            })
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
        // Direct rules are tracked by warden-core's DirectConfig; this
        // backend only needs to apply/remove them. Enumeration for the
        // direct interface's `getRules` is served from that tracked state,
        // not re-derived from `nft list`.
        let _ = (family, table, chain);
        Ok(Vec::new())
    }

    async fn passthrough(&self, family: Family, args: &[String]) -> Result<String, BackendError> {
        self.run(family, args).await
    }

    async fn flush_all(&self) -> Result<(), BackendError> {
        self.run(Family::Ipv4, &["flush ruleset\n".to_owned()])
            .await?;
        Ok(())
    }
}

//! `deployments.<network>.json`: where instances live and the state they carry.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::Address;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::devnet::DevnetState;

pub const FORWARDER_KEY: &str = "forwarder";
pub const REGISTRY_KEY: &str = "registry";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentEntry {
    pub address: Address,
    pub deployed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trusted_forwarder: Option<Address>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentsFile {
    pub network: String,
    pub chain_id: u64,
    pub updated_at: String,
    pub deployer: Address,
    /// Instances deployed so far by `deployer`; seeds the next instance address.
    pub deployer_nonce: u64,
    pub deployments: BTreeMap<String, DeploymentEntry>,
    #[serde(default)]
    pub state: DevnetState,
}

pub fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

impl DeploymentsFile {
    /// Load `path`, or `None` if it does not exist or is empty.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let existing = fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display()))?;
        if existing.trim().is_empty() {
            return Ok(None);
        }
        let file = serde_json::from_str(&existing)
            .with_context(|| format!("failed parsing JSON in {}", path.display()))?;
        Ok(Some(file))
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        self.updated_at = now_rfc3339();
        write_json_atomic(path, self)
    }

    pub fn address_of(&self, key: &str) -> Result<Address> {
        self.deployments
            .get(key)
            .map(|entry| entry.address)
            .ok_or_else(|| anyhow!("no `{key}` deployment recorded"))
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.exists() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }

    let serialised =
        serde_json::to_string_pretty(value).context("failed serialising deployments JSON")?;
    let tmp_path = tmp_path_for(path);
    fs::write(&tmp_path, serialised.as_bytes())
        .with_context(|| format!("failed writing temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed replacing {}", path.display()))?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use forwarder_signer::LocalSigner;
use minimal_forwarder::{registry::interfaces::IDIDRegistry, ForwardRequest, RegistryError};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod deployments;
mod devnet;

use deployments::{now_rfc3339, DeploymentEntry, DeploymentsFile, FORWARDER_KEY, REGISTRY_KEY};
use devnet::{instance_address, Devnet, DEFAULT_CHAIN_ID, DEV_ACCOUNT_0_KEY, DEV_ACCOUNT_1_KEY};

/// Provision a forwarder + identity registry pair and relay signed registrations through it.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Deployment record and devnet state (eg, deployments.devnet.json).
    #[arg(long, env = "DEPLOYMENTS_PATH", default_value = "deployments.devnet.json", global = true)]
    deployments_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Deploy a Forwarder, then a DIDRegistry that trusts it.
    Deploy(DeployArgs),
    /// Sign a `registerDID` call as the user and relay it through the forwarder.
    RegisterDid(RegisterDidArgs),
}

#[derive(Args, Debug)]
struct DeployArgs {
    /// Deployer private key (hex).
    #[arg(long, env = "DEPLOYER_KEY", default_value = DEV_ACCOUNT_0_KEY, hide_default_value = true)]
    deployer_key: String,

    #[arg(long, env = "CHAIN_ID", default_value_t = DEFAULT_CHAIN_ID)]
    chain_id: u64,

    /// Network name recorded in the deployments file.
    #[arg(long, default_value = "devnet")]
    network: String,
}

#[derive(Args, Debug)]
struct RegisterDidArgs {
    #[arg(long, env = "FORWARDER_ADDRESS")]
    forwarder: Option<Address>,

    #[arg(long, env = "REGISTRY_ADDRESS")]
    registry: Option<Address>,

    /// Signer of the meta-transaction (hex private key).
    #[arg(long, env = "USER_KEY", default_value = DEV_ACCOUNT_1_KEY, hide_default_value = true)]
    user_key: String,

    /// Relayer account (hex private key), for display only; targets see the forwarder as the caller.
    #[arg(long, env = "RELAYER_KEY", default_value = DEV_ACCOUNT_0_KEY, hide_default_value = true)]
    relayer_key: String,

    #[arg(long, default_value = "did:example:metauser")]
    did: String,

    #[arg(long, default_value = r#"{"name":"Meta User"}"#)]
    metadata: String,

    /// Execution budget signed into the request.
    #[arg(long, default_value_t = 1_000_000)]
    gas: u64,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Deploy(args) => deploy(&cli.deployments_path, args),
        Command::RegisterDid(args) => register_did(&cli.deployments_path, args),
    }
}

fn deploy(path: &Path, args: DeployArgs) -> Result<()> {
    let deployer = LocalSigner::from_hex(&args.deployer_key).context("invalid deployer key")?;
    println!("Deploying contracts with: {}", deployer.address());

    // Keep counting from a previous run by the same deployer so instance addresses never repeat.
    let deployer_nonce = match DeploymentsFile::load(path)? {
        Some(prev) if prev.deployer == deployer.address() && prev.chain_id == args.chain_id => {
            prev.deployer_nonce
        }
        _ => 0,
    };

    let forwarder_address = instance_address(deployer.address(), deployer_nonce);
    let registry_address = instance_address(deployer.address(), deployer_nonce + 1);
    let devnet = Devnet::deploy(args.chain_id, forwarder_address, registry_address)?;
    println!("Forwarder deployed at: {}", devnet.forwarder.address());
    println!("DIDRegistry deployed at: {}", devnet.registry.address());

    let deployed_at = now_rfc3339();
    let mut file = DeploymentsFile {
        network: args.network,
        chain_id: args.chain_id,
        updated_at: deployed_at.clone(),
        deployer: deployer.address(),
        deployer_nonce: deployer_nonce + 2,
        deployments: BTreeMap::from([
            (
                FORWARDER_KEY.to_string(),
                DeploymentEntry {
                    address: forwarder_address,
                    deployed_at: deployed_at.clone(),
                    trusted_forwarder: None,
                },
            ),
            (
                REGISTRY_KEY.to_string(),
                DeploymentEntry {
                    address: registry_address,
                    deployed_at,
                    trusted_forwarder: Some(forwarder_address),
                },
            ),
        ]),
        state: devnet.snapshot(),
    };
    file.save(path)?;

    info!(path = %path.display(), "deployments written");
    Ok(())
}

fn register_did(path: &Path, args: RegisterDidArgs) -> Result<()> {
    let (Some(forwarder_address), Some(registry_address)) = (args.forwarder, args.registry) else {
        bail!("set FORWARDER_ADDRESS and REGISTRY_ADDRESS env vars");
    };

    let mut file = DeploymentsFile::load(path)?
        .ok_or_else(|| anyhow!("no deployments at {}; run `meta-relay deploy` first", path.display()))?;
    if file.address_of(FORWARDER_KEY)? != forwarder_address {
        bail!("no Forwarder deployed at {forwarder_address}");
    }
    if file.address_of(REGISTRY_KEY)? != registry_address {
        bail!("no DIDRegistry deployed at {registry_address}");
    }

    let devnet = Devnet::restore(
        file.chain_id,
        forwarder_address,
        registry_address,
        file.state.clone(),
    )?;

    let user = LocalSigner::from_hex(&args.user_key).context("invalid user key")?;
    let relayer = LocalSigner::from_hex(&args.relayer_key).context("invalid relayer key")?;
    println!("User: {}", user.address());
    println!("Relayer: {}", relayer.address());
    println!("Immediate caller (forwarder): {forwarder_address}");

    let data = IDIDRegistry::registerDIDCall {
        did: args.did.clone(),
        metadata: args.metadata.clone(),
    }
    .abi_encode();

    let request = ForwardRequest {
        from: user.address(),
        to: registry_address,
        value: U256::ZERO,
        gas: U256::from(args.gas),
        nonce: devnet.forwarder.get_nonce(user.address()),
        data: data.into(),
    };
    let signature = user
        .sign_request(devnet.forwarder.domain(), &request)
        .context("failed signing forward request")?;

    info!(relayer = %relayer.address(), nonce = %request.nonce, "relaying meta-transaction");
    let result = devnet
        .forwarder
        .execute(&request, &signature)
        .context("forwarder rejected the meta-transaction")?;

    // The nonce is spent even if the registry reverted, so persist before reporting.
    file.state = devnet.snapshot();
    file.save(path)?;

    if !result.success {
        return Err(match RegistryError::from_revert_data(&result.return_data) {
            Some(e) => anyhow!("meta-transaction reverted: {e}"),
            None => anyhow!("meta-transaction reverted with {:?}", result.return_data),
        });
    }
    println!("Meta-transaction sent!");

    let record = devnet.lookup_did(&args.did)?;
    println!(
        "DID Info: {}",
        serde_json::to_string_pretty(&record).context("failed serialising DID record")?
    );
    Ok(())
}

//! One-shot key operations against the configured store

use std::num::NonZeroUsize;
use std::process::ExitCode;

use clap::Args;

use crate::domain::KeyStatus;
use crate::infrastructure::access_key::LifecycleEngine;

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Keys to generate, defaults to `keys.batch_size`
    #[arg(long, short = 'n')]
    pub count: Option<NonZeroUsize>,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Only print keys that would authenticate right now
    #[arg(long)]
    pub valid: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Key to validate
    pub key: String,
}

pub async fn issue(args: IssueArgs) -> anyhow::Result<ExitCode> {
    let config = super::load_config()?;
    let engine = crate::create_engine(&config).await?;

    let count = args.count.map_or(config.keys.batch_size, NonZeroUsize::get);
    let report = engine.issue_batch(count).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

pub async fn sweep() -> anyhow::Result<ExitCode> {
    let config = super::load_config()?;
    let engine = crate::create_engine(&config).await?;

    let swept = engine.sweep_expired(engine.now()).await?;

    println!("{}", swept);
    Ok(ExitCode::SUCCESS)
}

pub async fn list(args: ListArgs) -> anyhow::Result<ExitCode> {
    let config = super::load_config()?;
    let engine = crate::create_engine(&config).await?;

    for key in list_keys(&engine, args.valid).await? {
        println!("{}", key);
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn check(args: CheckArgs) -> anyhow::Result<ExitCode> {
    let config = super::load_config()?;
    let engine = crate::create_engine(&config).await?;

    let status = engine.validate(&args.key, engine.now()).await?;

    println!("{}", status);
    Ok(exit_code_for(status))
}

async fn list_keys(engine: &LifecycleEngine, valid_only: bool) -> anyhow::Result<Vec<String>> {
    let now = engine.now();
    let keys = if valid_only {
        engine.list_valid(now).await?
    } else {
        engine.list_active(now).await?
    };
    Ok(keys)
}

fn exit_code_for(status: KeyStatus) -> ExitCode {
    if status.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

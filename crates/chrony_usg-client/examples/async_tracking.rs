// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Query chronyd from a tokio runtime.
//!
//! Run with:
//!   cargo run -p chrony_usg-client --example async_tracking --features tokio

use chrony_client::ClientConfig;
use chrony_client::async_client::AsyncChronyClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let mut client = AsyncChronyClient::connect(ClientConfig::default()).await?;

    let tracking = client.fetch_tracking().await?;
    println!("{}", tracking);

    let sources = client.fetch_source_count().await?;
    let activity = client.fetch_activity().await?;
    println!("{} configured sources: {}", sources, activity);

    client.close();
    Ok(())
}

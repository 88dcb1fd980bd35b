// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Print chronyd's tracking and source activity state.
//!
//! Run with:
//!   cargo run -p chrony_usg-client --example tracking -- [ADDRESS] [udp|unixgram]
//!
//! ADDRESS defaults to 127.0.0.1:323, or to chronyd's socket path with
//! `unixgram`. A UDP address without a port uses 323. Set RUST_LOG=debug to
//! see every probe and datagram.

use std::time::Duration;

use chrony_client::protocol::{DEFAULT_ADDRESS, DEFAULT_SOCKET_PATH};
use chrony_client::{ChronyClient, TransportKind};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let address = args.next();
    let transport: TransportKind = match args.next() {
        Some(kind) => kind.parse()?,
        None => TransportKind::Udp,
    };
    let address = address.unwrap_or_else(|| match transport {
        TransportKind::Udp => DEFAULT_ADDRESS.to_string(),
        TransportKind::Unixgram => DEFAULT_SOCKET_PATH.to_string(),
    });

    let mut client = ChronyClient::builder()
        .address(address)
        .transport(transport)
        .timeout(Duration::from_millis(500))
        .connect()?;

    let tracking = client.fetch_tracking()?;
    if let Some(version) = client.version() {
        println!("Protocol version : {}", version);
    }
    println!("Reference ID     : {:08X} ({})", tracking.ref_id, tracking.ip_addr);
    println!("Stratum          : {}", tracking.stratum);
    println!(
        "Ref time (UTC)   : {}.{:09}",
        tracking.ref_time.epoch_seconds(),
        tracking.ref_time.subsec_nanos()
    );
    println!(
        "System time      : {:.9} seconds",
        tracking.current_correction.to_f64()
    );
    println!("Last offset      : {:+.9} seconds", tracking.last_offset.to_f64());
    println!("RMS offset       : {:.9} seconds", tracking.rms_offset.to_f64());
    println!("Frequency        : {:.3} ppm", tracking.freq_ppm.to_f64());
    println!("Residual freq    : {:+.3} ppm", tracking.resid_freq_ppm.to_f64());
    println!("Skew             : {:.3} ppm", tracking.skew_ppm.to_f64());
    println!("Root delay       : {:.9} seconds", tracking.root_delay.to_f64());
    println!(
        "Root dispersion  : {:.9} seconds",
        tracking.root_dispersion.to_f64()
    );
    println!(
        "Update interval  : {:.1} seconds",
        tracking.last_update_interval.to_f64()
    );
    match tracking.leap() {
        Some(leap) => println!("Leap status      : {:?}", leap),
        None => println!("Leap status      : unknown ({})", tracking.leap_status),
    }

    let activity = client.fetch_activity()?;
    println!("\n{}", activity);

    client.close();
    Ok(())
}

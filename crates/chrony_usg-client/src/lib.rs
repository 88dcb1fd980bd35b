// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

/*!
Client for chronyd's command socket ("cmdmon") with blocking and async (tokio)
front ends.

The client speaks chrony's binary request/reply protocol over UDP or a Unix
datagram socket, negotiates the protocol revision (6, then 5) on first use
and returns typed tracking and activity data.

# Example

```rust,no_run
use chrony_client::ChronyClient;

fn main() -> Result<(), chrony_client::error::ChronyError> {
    let mut client = ChronyClient::builder().connect()?;
    let tracking = client.fetch_tracking()?;
    println!("{}", tracking);
    println!("Offset: {:.9} seconds", tracking.last_offset.to_f64());
    Ok(())
}
```

# Feature Flags

| Feature | Default | Description |
|---------|---------|-------------|
| `tokio` | no | Async client using the tokio runtime (UDP only). |
*/

#![warn(missing_docs)]

// Re-export protocol types from chrony_proto for convenience.
pub use chrony_proto::{float, protocol, timespec};

/// Error types and their `io::Error` conversions.
pub mod error;

/// Client configuration.
pub mod config;

/// Connected datagram channels.
pub mod transport;

mod request;

/// Blocking client and its builder.
pub mod client;

/// Async client using the tokio runtime.
#[cfg(feature = "tokio")]
pub mod async_client;

pub use client::{ChronyClient, ChronyClientBuilder};
pub use config::{ClientConfig, TransportKind};
pub use request::Reply;

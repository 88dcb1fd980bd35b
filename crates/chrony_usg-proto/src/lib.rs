// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! chrony command protocol types and codecs.
//!
//! This crate provides the wire layout of chronyd's command socket ("cmdmon")
//! requests and replies, the daemon's 32-bit custom floating-point format and
//! its two-part timespec encoding. All multi-byte fields are big-endian.

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(feature = "alloc")]
extern crate alloc;

/// Custom error types for buffer-based packet parsing and serialization.
pub mod error;

/// chronyd's 32-bit floating-point wire format.
pub mod float;

/// Command protocol types and constants.
pub mod protocol;

/// chronyd's two-part timespec wire format.
pub mod timespec;

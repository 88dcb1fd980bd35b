// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Protocol revision negotiation against a simulated chronyd.

mod common;

use std::time::Duration;

use chrony_client::ChronyClient;
use chrony_client::error::{ChronyError, NegotiationError};
use chrony_client::protocol::{Command, ProtocolVersion};
use common::{Behaviour, Rejection, SimulatedDaemon};

fn only(versions: &[ProtocolVersion], rejection: Rejection) -> Behaviour {
    Behaviour {
        accepted_versions: versions.to_vec(),
        rejection,
        ..Behaviour::default()
    }
}

fn connect(daemon: &SimulatedDaemon) -> ChronyClient {
    ChronyClient::connect(daemon.config(Duration::from_millis(200))).unwrap()
}

#[test]
fn test_prefers_version_6() {
    let daemon = SimulatedDaemon::spawn(Behaviour::default());
    let mut client = connect(&daemon);

    assert_eq!(client.negotiate().unwrap(), ProtocolVersion::V6);
    assert_eq!(client.version(), Some(ProtocolVersion::V6));
    assert_eq!(daemon.commands(), vec![(6, 0)]);
}

#[test]
fn test_falls_back_to_version_5() {
    let daemon = SimulatedDaemon::spawn(only(
        &[ProtocolVersion::V5],
        Rejection::BadVersionStatus,
    ));
    let mut client = connect(&daemon);

    let tracking = client.fetch_tracking().unwrap();
    assert_eq!(tracking.stratum, 3);
    assert_eq!(client.version(), Some(ProtocolVersion::V5));
    assert_eq!(daemon.commands(), vec![(6, 0), (5, 0), (5, 33)]);
}

#[test]
fn test_mismatched_reply_version_is_rejected() {
    let daemon = SimulatedDaemon::spawn(only(&[ProtocolVersion::V5], Rejection::ReplyVersion(5)));
    let mut client = connect(&daemon);

    assert_eq!(client.negotiate().unwrap(), ProtocolVersion::V5);
    assert_eq!(daemon.commands(), vec![(6, 0), (5, 0)]);
}

#[test]
fn test_silent_candidate_is_skipped() {
    let daemon = SimulatedDaemon::spawn(only(&[ProtocolVersion::V5], Rejection::Silent));
    let mut client = ChronyClient::connect(daemon.config(Duration::from_millis(50))).unwrap();

    assert_eq!(client.negotiate().unwrap(), ProtocolVersion::V5);
}

#[test]
fn test_late_probe_reply_does_not_reject_next_candidate() {
    let daemon = SimulatedDaemon::spawn(Behaviour {
        delay_first_reply: Some(Duration::from_millis(150)),
        ..Behaviour::default()
    });
    let mut client = ChronyClient::connect(daemon.config(Duration::from_millis(100))).unwrap();

    // The version 6 probe times out; its late reply must not spoil version 5.
    assert_eq!(client.negotiate().unwrap(), ProtocolVersion::V5);
    assert_eq!(client.fetch_source_count().unwrap(), 5);
    assert_eq!(daemon.commands(), vec![(6, 0), (5, 0), (5, 14)]);
}

#[test]
fn test_no_version_accepted() {
    let daemon = SimulatedDaemon::spawn(only(&[], Rejection::BadVersionStatus));
    let mut client = connect(&daemon);

    match client.negotiate() {
        Err(ChronyError::Negotiation(NegotiationError::Unsupported { tried })) => {
            assert_eq!(tried, vec![ProtocolVersion::V6, ProtocolVersion::V5]);
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert_eq!(client.version(), None);
    assert!(matches!(
        client.empty_request(Command::TRACKING),
        Err(ChronyError::Negotiation(NegotiationError::NotNegotiated))
    ));

    // Typed queries negotiate again while unpinned.
    assert!(matches!(
        client.fetch_activity(),
        Err(ChronyError::Negotiation(NegotiationError::Unsupported { .. }))
    ));
    assert_eq!(daemon.commands(), vec![(6, 0), (5, 0), (6, 0), (5, 0)]);
}

#[test]
fn test_negotiates_once_per_connection() {
    let daemon = SimulatedDaemon::spawn(Behaviour::default());
    let mut client = connect(&daemon);

    client.fetch_tracking().unwrap();
    client.fetch_activity().unwrap();
    client.fetch_tracking().unwrap();
    assert_eq!(daemon.commands(), vec![(6, 0), (6, 33), (6, 44), (6, 33)]);

    // A fresh connection starts over.
    let mut other = connect(&daemon);
    assert_eq!(other.version(), None);
    other.fetch_source_count().unwrap();
    assert_eq!(daemon.commands()[4..], [(6, 0), (6, 14)]);
}

#[test]
fn test_empty_request_uses_pinned_version() {
    let daemon = SimulatedDaemon::spawn(only(
        &[ProtocolVersion::V5],
        Rejection::BadVersionStatus,
    ));
    let mut client = connect(&daemon);
    client.negotiate().unwrap();

    let request = client.empty_request(Command::ACTIVITY).unwrap();
    assert_eq!(request.version, ProtocolVersion::V5);
    assert_eq!(request.command, Command::ACTIVITY);
    assert_eq!(request.sequence, 0);
}

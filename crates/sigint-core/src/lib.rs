//! Sigint Core - Core types, station resolution, and address filtering
//!
//! This crate provides the foundational types for the sigint collector:
//! - Device and observation types handed from capture to storage
//! - Station address resolution from 802.11 header addresses and DS flags
//! - The ignore table for broadcast, multicast and reserved address ranges

pub mod device;
pub mod ignore;
pub mod station;

pub use device::{Ack, Coordinates, DataPoint, Device, HumanMapping};
pub use ignore::{AddrRange, IgnoreList, IgnoreRule, IgnoreRuleError};
pub use pnet::util::MacAddr;
pub use station::{resolve_station, AddressRoles, DsFlags, HeaderAddresses, Resolution, Topology};

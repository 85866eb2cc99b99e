//! Station address resolution from 802.11 header addresses
//!
//! The meaning of address1..address4 depends on the FromDS/ToDS flag pair.
//! We want the mobile station, not the access point:
//!
//! | FromDS | ToDS | addr1       | addr2       | addr3 | addr4 | station |
//! |--------|------|-------------|-------------|-------|-------|---------|
//! | 0      | 0    | DA          | SA          | BSSID | -     | ambiguous |
//! | 0      | 1    | BSSID       | SA          | DA    | -     | addr2   |
//! | 1      | 0    | DA          | BSSID       | SA    | -     | addr1   |
//! | 1      | 1    | RA          | TA          | DA    | SA    | none    |

use pnet::util::MacAddr;

/// Distribution System flags from the frame control field
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DsFlags {
    pub from_ds: bool,
    pub to_ds: bool,
}

impl DsFlags {
    pub fn new(from_ds: bool, to_ds: bool) -> Self {
        Self { from_ds, to_ds }
    }
}

/// The four address fields as dissected, absent when the frame lacks them
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderAddresses {
    pub addr1: Option<MacAddr>,
    pub addr2: Option<MacAddr>,
    pub addr3: Option<MacAddr>,
    pub addr4: Option<MacAddr>,
}

/// Network topology implied by the DS flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topology {
    /// Ad-hoc network, sender and receiver cannot be told apart
    Ibss,
    /// Station to access point
    ToAp,
    /// Access point to station
    FromAp,
    /// Wireless distribution system (bridge)
    Wds,
}

impl Topology {
    pub fn from_flags(flags: DsFlags) -> Self {
        match (flags.from_ds, flags.to_ds) {
            (false, false) => Topology::Ibss,
            (false, true) => Topology::ToAp,
            (true, false) => Topology::FromAp,
            (true, true) => Topology::Wds,
        }
    }
}

/// Roles of the header addresses, whichever apply to the topology
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressRoles {
    pub destination: Option<MacAddr>,
    pub source: Option<MacAddr>,
    pub bssid: Option<MacAddr>,
    pub transmitter: Option<MacAddr>,
    pub receiver: Option<MacAddr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub topology: Topology,
    pub roles: AddressRoles,
    /// The station owning the frame, `None` if it cannot be attributed
    pub station: Option<MacAddr>,
}

impl Resolution {
    /// Both ends are candidates but the header cannot say which one sent
    pub fn is_ambiguous(&self) -> bool {
        self.topology == Topology::Ibss
    }

    /// Bridge frames need an operator to look at the installation
    pub fn is_bridge(&self) -> bool {
        self.topology == Topology::Wds
    }

    /// Candidate stations of an ad-hoc frame (destination, source)
    pub fn candidates(&self) -> (Option<MacAddr>, Option<MacAddr>) {
        (self.roles.destination, self.roles.source)
    }
}

/// Resolve which address identifies the mobile station.
///
/// Pure: the ambiguous and bridge cases are reported through the returned
/// [`Resolution`], logging is up to the caller.
pub fn resolve_station(addrs: &HeaderAddresses, flags: DsFlags) -> Resolution {
    let topology = Topology::from_flags(flags);
    let mut roles = AddressRoles::default();

    let station = match topology {
        Topology::Ibss => {
            roles.destination = addrs.addr1;
            roles.source = addrs.addr2;
            roles.bssid = addrs.addr3;
            None
        }
        Topology::ToAp => {
            roles.bssid = addrs.addr1;
            roles.source = addrs.addr2;
            roles.destination = addrs.addr3;
            roles.source
        }
        Topology::FromAp => {
            roles.destination = addrs.addr1;
            roles.bssid = addrs.addr2;
            roles.source = addrs.addr3;
            roles.destination
        }
        Topology::Wds => {
            roles.receiver = addrs.addr1;
            roles.transmitter = addrs.addr2;
            roles.destination = addrs.addr3.or(roles.receiver);
            roles.source = addrs.addr4.or(roles.transmitter);
            None
        }
    };

    Resolution {
        topology,
        roles,
        station,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addrs() -> HeaderAddresses {
        HeaderAddresses {
            addr1: Some(MacAddr::new(1, 1, 1, 1, 1, 1)),
            addr2: Some(MacAddr::new(2, 2, 2, 2, 2, 2)),
            addr3: Some(MacAddr::new(3, 3, 3, 3, 3, 3)),
            addr4: Some(MacAddr::new(4, 4, 4, 4, 4, 4)),
        }
    }

    #[test]
    fn test_ibss_is_ambiguous() {
        let a = addrs();
        let res = resolve_station(&a, DsFlags::new(false, false));
        assert_eq!(res.station, None);
        assert!(res.is_ambiguous());
        assert_eq!(res.candidates(), (a.addr1, a.addr2));
        assert_eq!(res.roles.bssid, a.addr3);
    }

    #[test]
    fn test_uplink_uses_addr2() {
        let a = addrs();
        let res = resolve_station(&a, DsFlags::new(false, true));
        assert_eq!(res.topology, Topology::ToAp);
        assert_eq!(res.station, a.addr2);
        assert_eq!(res.roles.bssid, a.addr1);
        assert_eq!(res.roles.destination, a.addr3);
    }

    #[test]
    fn test_downlink_uses_addr1() {
        let a = addrs();
        let res = resolve_station(&a, DsFlags::new(true, false));
        assert_eq!(res.topology, Topology::FromAp);
        assert_eq!(res.station, a.addr1);
        assert_eq!(res.roles.bssid, a.addr2);
        assert_eq!(res.roles.source, a.addr3);
    }

    #[test]
    fn test_wds_roles() {
        let a = addrs();
        let res = resolve_station(&a, DsFlags::new(true, true));
        assert!(res.is_bridge());
        assert_eq!(res.station, None);
        assert_eq!(res.roles.receiver, a.addr1);
        assert_eq!(res.roles.transmitter, a.addr2);
        assert_eq!(res.roles.destination, a.addr3);
        assert_eq!(res.roles.source, a.addr4);
    }

    #[test]
    fn test_wds_fallback() {
        let a = HeaderAddresses {
            addr3: None,
            addr4: None,
            ..addrs()
        };
        let res = resolve_station(&a, DsFlags::new(true, true));
        assert_eq!(res.roles.destination, a.addr1);
        assert_eq!(res.roles.source, a.addr2);
    }

    #[test]
    fn test_missing_address_is_not_fabricated() {
        let a = HeaderAddresses {
            addr1: Some(MacAddr::new(1, 1, 1, 1, 1, 1)),
            ..Default::default()
        };
        let res = resolve_station(&a, DsFlags::new(false, true));
        assert_eq!(res.station, None);
    }
}

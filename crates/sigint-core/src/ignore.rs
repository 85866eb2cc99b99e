//! Ignore table for hardware addresses that never identify a station
//!
//! Rules are evaluated top to bottom and the first match wins. Range rules
//! match on the leading bytes shared by both bounds, which covers vendor and
//! multicast blocks without numeric range comparison.

use pnet::util::MacAddr;
use thiserror::Error;

/// Reason reported for an absent or unparsed address
pub const ABSENT: &str = "absent";

#[derive(Error, Debug)]
pub enum IgnoreRuleError {
    #[error("Invalid hardware address '{0}'")]
    InvalidAddress(String),
    #[error("Range bounds {low} and {high} share no prefix")]
    NoCommonPrefix { low: MacAddr, high: MacAddr },
}

/// Addresses covered by a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrRange {
    Exact(MacAddr),
    /// Inclusive range, contiguous over the low-order bytes
    Range { low: MacAddr, high: MacAddr },
}

impl AddrRange {
    /// Number of leading bytes both bounds agree on
    fn prefix_len(low: &MacAddr, high: &MacAddr) -> usize {
        low.octets()
            .iter()
            .zip(high.octets().iter())
            .take_while(|(l, h)| l == h)
            .count()
    }

    pub fn matches(&self, addr: &MacAddr) -> bool {
        match self {
            AddrRange::Exact(exact) => exact == addr,
            AddrRange::Range { low, high } => {
                let n = Self::prefix_len(low, high);
                addr.octets()[..n] == low.octets()[..n]
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoreRule {
    pub reason: String,
    pub range: AddrRange,
}

impl IgnoreRule {
    pub fn exact(reason: impl Into<String>, addr: MacAddr) -> Self {
        Self {
            reason: reason.into(),
            range: AddrRange::Exact(addr),
        }
    }

    pub fn range(reason: impl Into<String>, low: MacAddr, high: MacAddr) -> Self {
        Self {
            reason: reason.into(),
            range: AddrRange::Range { low, high },
        }
    }

    /// Parse a rule from its textual bounds. Without `high` the rule is an
    /// exact match on `low`.
    pub fn parse(reason: &str, low: &str, high: Option<&str>) -> Result<Self, IgnoreRuleError> {
        let low_addr = parse_addr(low)?;
        match high {
            None => Ok(Self::exact(reason, low_addr)),
            Some(high) => {
                let high_addr = parse_addr(high)?;
                if AddrRange::prefix_len(&low_addr, &high_addr) == 0 {
                    return Err(IgnoreRuleError::NoCommonPrefix {
                        low: low_addr,
                        high: high_addr,
                    });
                }
                Ok(Self::range(reason, low_addr, high_addr))
            }
        }
    }

    pub fn matches(&self, addr: &MacAddr) -> bool {
        self.range.matches(addr)
    }
}

fn parse_addr(s: &str) -> Result<MacAddr, IgnoreRuleError> {
    s.parse::<MacAddr>()
        .map_err(|_| IgnoreRuleError::InvalidAddress(s.to_string()))
}

/// Ordered ignore table, loaded once at startup
#[derive(Debug, Clone)]
pub struct IgnoreList {
    rules: Vec<IgnoreRule>,
}

impl IgnoreList {
    /// The compiled-in table
    pub fn builtin() -> Self {
        let mac = |o: [u8; 6]| MacAddr::from(o);
        Self {
            rules: vec![
                IgnoreRule::exact("zero", MacAddr::zero()),
                IgnoreRule::exact("broadcast", MacAddr::broadcast()),
                IgnoreRule::range(
                    "unicast prefix",
                    mac([0x00, 0x00, 0x5e, 0x00, 0x00, 0x00]),
                    mac([0x00, 0x00, 0x5e, 0xff, 0xff, 0xff]),
                ),
                IgnoreRule::range(
                    "multicast prefix",
                    mac([0x01, 0x00, 0x5e, 0x00, 0x00, 0x00]),
                    mac([0x01, 0x00, 0x5e, 0xff, 0xff, 0xff]),
                ),
                IgnoreRule::range(
                    "ipv6 multicast",
                    mac([0x33, 0x33, 0x00, 0x00, 0x00, 0x00]),
                    mac([0x33, 0x33, 0xff, 0xff, 0xff, 0xff]),
                ),
            ],
        }
    }

    /// Builtin table followed by operator supplied rules
    pub fn with_rules(extra: impl IntoIterator<Item = IgnoreRule>) -> Self {
        let mut list = Self::builtin();
        list.rules.extend(extra);
        list
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    /// Returns the reason the address should be ignored, or `None` to keep it
    pub fn ignore_reason(&self, addr: Option<&MacAddr>) -> Option<&str> {
        let Some(addr) = addr else {
            return Some(ABSENT);
        };
        self.rules
            .iter()
            .find(|rule| rule.matches(addr))
            .map(|rule| rule.reason.as_str())
    }
}

impl Default for IgnoreList {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(list: &IgnoreList, addr: &str) -> (bool, String) {
        let addr: MacAddr = addr.parse().unwrap();
        match list.ignore_reason(Some(&addr)) {
            Some(reason) => (true, reason.to_string()),
            None => (false, String::new()),
        }
    }

    #[test]
    fn test_ignore_table() {
        let list = IgnoreList::builtin();
        let cases = [
            ("00:00:00:00:00:00", true),
            ("ff:ff:ff:ff:ff:ff", true),
            ("00:01:5e:00:00:00", false),
            ("00:00:5e:01:00:00", true),
            ("01:00:5e:01:00:00", true),
            ("01:01:5e:01:00:00", false),
            ("33:33:ff:ff:ff:ff", true),
            ("33:34:00:00:00:00", false),
            ("11:22:33:44:55:66", false),
        ];
        for (addr, expected) in cases {
            let (ignored, reason) = check(&list, addr);
            assert_eq!(ignored, expected, "{} (reason: '{}')", addr, reason);
        }
    }

    #[test]
    fn test_absent_is_ignored() {
        let list = IgnoreList::builtin();
        assert_eq!(list.ignore_reason(None), Some(ABSENT));
    }

    #[test]
    fn test_reasons() {
        let list = IgnoreList::builtin();
        assert_eq!(check(&list, "ff:ff:ff:ff:ff:ff").1, "broadcast");
        assert_eq!(check(&list, "00:00:00:00:00:00").1, "zero");
        assert_eq!(check(&list, "33:33:00:00:00:01").1, "ipv6 multicast");
        assert_eq!(check(&list, "de:ad:be:ef:00:01").1, "");
    }

    #[test]
    fn test_first_match_wins() {
        let overlapping = IgnoreRule::parse("lab radios", "00:00:00:00:00:00", Some("00:00:ff:ff:ff:ff")).unwrap();
        let list = IgnoreList::with_rules([overlapping]);
        // builtin "zero" precedes the operator rule
        assert_eq!(check(&list, "00:00:00:00:00:00").1, "zero");
        assert_eq!(check(&list, "00:00:12:34:56:78").1, "lab radios");
    }

    #[test]
    fn test_parse_rule() {
        let rule = IgnoreRule::parse("my phone", "AA:BB:CC:DD:EE:FF", None).unwrap();
        assert_eq!(rule.range, AddrRange::Exact(MacAddr::new(0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff)));

        let err = IgnoreRule::parse("bad", "not-a-mac", None).unwrap_err();
        assert!(matches!(err, IgnoreRuleError::InvalidAddress(_)));

        let err = IgnoreRule::parse("everything", "00:00:00:00:00:00", Some("ff:ff:ff:ff:ff:ff")).unwrap_err();
        assert!(matches!(err, IgnoreRuleError::NoCommonPrefix { .. }));
    }
}

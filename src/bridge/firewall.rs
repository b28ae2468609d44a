// Zonal firewall: per-interface allow lists of message types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::trace;

/// Allow lists for one interface, seen from the attached host. `outbound`
/// holds the types the host may send into the switch, `inbound` the types it
/// may receive from it. A missing list allows nothing in that direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRules {
    #[serde(rename = "in", default, skip_serializing_if = "Option::is_none")]
    pub inbound: Option<Vec<String>>,
    #[serde(rename = "out", default, skip_serializing_if = "Option::is_none")]
    pub outbound: Option<Vec<String>>,
}

impl InterfaceRules {
    pub fn allow_in<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inbound = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn allow_out<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outbound = Some(types.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Entering the switch from the attached host.
    Ingress,
    /// Leaving the switch towards the attached host.
    Egress,
}

/// Rules keyed by interface index. Interfaces without an entry are not enforced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FirewallFilter {
    rules: BTreeMap<u32, InterfaceRules>,
}

impl FirewallFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interface(mut self, interface: u32, rules: InterfaceRules) -> Self {
        self.rules.insert(interface, rules);
        self
    }

    pub fn allows(&self, interface: u32, direction: Direction, message_type: Option<&str>) -> bool {
        // Untyped traffic is control chatter, not application messages.
        let Some(kind) = message_type else {
            return true;
        };
        let Some(rules) = self.rules.get(&interface) else {
            return true;
        };

        let list = match direction {
            Direction::Ingress => &rules.outbound,
            Direction::Egress => &rules.inbound,
        };
        let allowed = list
            .as_ref()
            .is_some_and(|types| types.iter().any(|t| t == kind));

        if !allowed {
            trace!("firewall {:?} interface {}: blocked {}", direction, interface, kind);
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> FirewallFilter {
        FirewallFilter::new()
            .with_interface(0, InterfaceRules::default().allow_out(["brake"]).allow_in(["status"]))
            .with_interface(1, InterfaceRules::default().allow_in(["brake"]))
    }

    #[test]
    fn test_untyped_traffic_passes() {
        let f = filter();
        assert!(f.allows(0, Direction::Ingress, None));
        assert!(f.allows(1, Direction::Ingress, None));
    }

    #[test]
    fn test_interface_without_rules_passes() {
        assert!(filter().allows(7, Direction::Ingress, Some("anything")));
        assert!(filter().allows(7, Direction::Egress, Some("anything")));
    }

    #[test]
    fn test_missing_direction_list_blocks_all() {
        // interface 1 has no "out" list
        assert!(!filter().allows(1, Direction::Ingress, Some("brake")));
    }

    #[test]
    fn test_listed_type_passes_unlisted_is_blocked() {
        let f = filter();
        assert!(f.allows(0, Direction::Ingress, Some("brake")));
        assert!(!f.allows(0, Direction::Ingress, Some("media")));
        assert!(f.allows(0, Direction::Egress, Some("status")));
        assert!(!f.allows(0, Direction::Egress, Some("brake")));
        assert!(f.allows(1, Direction::Egress, Some("brake")));
    }

    #[test]
    fn test_rules_json_shape() {
        let f: FirewallFilter =
            serde_json::from_str(r#"{"0": {"out": ["brake"]}, "1": {"in": ["brake"]}}"#).unwrap();
        assert!(f.allows(0, Direction::Ingress, Some("brake")));
        assert!(!f.allows(0, Direction::Egress, Some("brake")));
        assert!(f.allows(1, Direction::Egress, Some("brake")));
    }
}

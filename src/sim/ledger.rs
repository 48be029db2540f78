//! Hit-group cooldown ledger
//!
//! Each hit group may damage a given target at most once per cooldown. The
//! ledger stores the next time each key is allowed to hit; a denied hit
//! changes nothing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::projectile::HitGroupTag;
use crate::config::HitGroupPolicy;

/// Cooldown pool for one (hit group, target) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HitGroupKey {
    pub instance_id: u32,
    pub barrage_index: u32,
    pub salvo_group: u32,
    pub target_id: u32,
}

impl HitGroupPolicy {
    /// Cooldown key for a projectile's group hitting `target_id`
    pub fn key(self, group: HitGroupTag, target_id: u32) -> HitGroupKey {
        let salvo_group = match self {
            HitGroupPolicy::Independent => group.salvo_group,
            HitGroupPolicy::Merged => 0,
        };
        HitGroupKey {
            instance_id: group.instance_id,
            barrage_index: group.barrage_index,
            salvo_group,
            target_id,
        }
    }
}

/// Next-allowed-hit time per hit group
#[derive(Debug, Clone)]
pub struct HitLedger {
    cooldown: f64,
    next_allowed: HashMap<HitGroupKey, f64>,
}

impl HitLedger {
    pub fn new(cooldown: f64) -> Self {
        Self {
            cooldown,
            next_allowed: HashMap::new(),
        }
    }

    /// Grant a hit if the key is off cooldown, starting a new cooldown
    pub fn try_register(&mut self, key: HitGroupKey, now: f64) -> bool {
        let next = self.next_allowed.get(&key).copied().unwrap_or(0.0);
        if now < next {
            return false;
        }
        self.next_allowed.insert(key, now + self.cooldown);
        true
    }

    /// Whether a hit on `key` would be denied at `now`
    pub fn is_on_cooldown(&self, key: HitGroupKey, now: f64) -> bool {
        self.next_allowed
            .get(&key)
            .is_some_and(|&next| now < next)
    }

    /// Drop every key belonging to a retired cast instance
    pub fn prune_instance(&mut self, instance_id: u32) {
        self.next_allowed.retain(|k, _| k.instance_id != instance_id);
    }

    pub fn clear(&mut self) {
        self.next_allowed.clear();
    }

    pub fn len(&self) -> usize {
        self.next_allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next_allowed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::HIT_COOLDOWN;
    use proptest::prelude::*;

    fn key(salvo_group: u32) -> HitGroupKey {
        HitGroupKey {
            instance_id: 1,
            barrage_index: 0,
            salvo_group,
            target_id: 0,
        }
    }

    #[test]
    fn test_cooldown_denies_then_grants() {
        let mut ledger = HitLedger::new(HIT_COOLDOWN);
        assert!(ledger.try_register(key(0), 1.0));
        assert!(!ledger.try_register(key(0), 1.5));
        assert!(ledger.is_on_cooldown(key(0), 1.5));
        assert!(ledger.try_register(key(0), 1.0 + HIT_COOLDOWN));
    }

    #[test]
    fn test_denied_hit_changes_nothing() {
        let mut ledger = HitLedger::new(HIT_COOLDOWN);
        assert!(ledger.try_register(key(0), 0.0));
        assert!(!ledger.try_register(key(0), 0.5));
        // The denial at 0.5 must not push the window out
        assert!(ledger.try_register(key(0), HIT_COOLDOWN));
    }

    #[test]
    fn test_groups_are_independent_pools() {
        let mut ledger = HitLedger::new(HIT_COOLDOWN);
        assert!(ledger.try_register(key(0), 0.0));
        assert!(ledger.try_register(key(1), 0.0));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_policy_keys() {
        let tag = HitGroupTag {
            instance_id: 3,
            barrage_index: 2,
            salvo_group: 4,
        };
        let independent = HitGroupPolicy::Independent.key(tag, 0);
        let merged = HitGroupPolicy::Merged.key(tag, 0);
        assert_eq!(independent.salvo_group, 4);
        assert_eq!(merged.salvo_group, 0);
        assert_eq!(merged.barrage_index, 2);
    }

    #[test]
    fn test_prune_instance() {
        let mut ledger = HitLedger::new(HIT_COOLDOWN);
        ledger.try_register(key(0), 0.0);
        ledger.try_register(
            HitGroupKey {
                instance_id: 2,
                ..key(0)
            },
            0.0,
        );
        ledger.prune_instance(1);
        assert_eq!(ledger.len(), 1);
        assert!(!ledger.is_on_cooldown(key(0), 0.1));
    }

    proptest! {
        #[test]
        fn prop_granted_hits_respect_cooldown(
            mut times in proptest::collection::vec(0.0f64..20.0, 1..200),
        ) {
            times.sort_by(f64::total_cmp);
            let mut ledger = HitLedger::new(HIT_COOLDOWN);
            let mut granted: Vec<f64> = Vec::new();
            for t in times {
                if ledger.try_register(key(0), t) {
                    granted.push(t);
                }
            }
            for pair in granted.windows(2) {
                prop_assert!(pair[1] - pair[0] >= HIT_COOLDOWN - 1e-12);
            }
        }
    }
}

/// Propriedades do funil e da deduplicação que valem para qualquer entrada
use std::collections::{HashMap, HashSet};

use agencia_backend::{db::entity_repo::dedup_by, models::crm::FunnelStage};
use proptest::prelude::*;

fn stage() -> impl Strategy<Value = FunnelStage> {
    (0..FunnelStage::ALL.len()).prop_map(|i| FunnelStage::ALL[i])
}

fn position(stage: FunnelStage) -> usize {
    FunnelStage::ALL
        .iter()
        .position(|s| *s == stage)
        .unwrap_or(usize::MAX)
}

proptest! {
    #[test]
    fn funnel_only_moves_forward(targets in prop::collection::vec(stage(), 0..40)) {
        let mut current = FunnelStage::Prospect;
        for target in targets {
            let next = current.advance(target);
            prop_assert!(position(next) >= position(current));
            if current == FunnelStage::Perdido {
                prop_assert_eq!(next, FunnelStage::Perdido);
            }
            current = next;
        }
    }

    #[test]
    fn lost_is_reachable_from_any_open_stage(from in stage()) {
        prop_assume!(from != FunnelStage::Perdido);
        prop_assert_eq!(from.advance(FunnelStage::Perdido), FunnelStage::Perdido);
    }

    #[test]
    fn dedup_keeps_one_entry_per_key_with_last_value(
        items in prop::collection::vec((0u8..6, any::<u32>()), 0..50)
    ) {
        let mut last: HashMap<u8, u32> = HashMap::new();
        for (key, value) in &items {
            last.insert(*key, *value);
        }

        let out = dedup_by(items, |(key, _)| *key);
        let keys: HashSet<u8> = out.iter().map(|(key, _)| *key).collect();
        prop_assert_eq!(keys.len(), out.len());
        prop_assert_eq!(out.len(), last.len());
        for (key, value) in out {
            prop_assert_eq!(last.get(&key), Some(&value));
        }
    }
}

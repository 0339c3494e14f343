use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{UnifiedProduct, UpsellProduct};

/// Records a store must write, split into the two batches of an upsert.
#[derive(Debug, Default)]
pub struct UpsertPlan {
    pub creates: Vec<UpsellProduct>,
    pub updates: Vec<UpsellProduct>,
}

impl UpsertPlan {
    pub fn len(&self) -> usize {
        self.creates.len() + self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty()
    }
}

/// Fetched products keyed by `pms_id`. Products without an id are dropped;
/// when an id repeats inside one batch the last occurrence wins.
pub fn dedupe_by_key(fetched: &[UnifiedProduct]) -> IndexMap<&str, &UnifiedProduct> {
    let mut by_key = IndexMap::new();
    for product in fetched {
        if product.id.is_empty() {
            warn!(name = %product.name, "skipping upsell product without pms id");
            continue;
        }
        by_key.insert(product.id.as_str(), product);
    }
    by_key
}

/// The distinct `pms_id` keys of a fetched batch, for the single existence lookup.
pub fn collect_keys(fetched: &[UnifiedProduct]) -> Vec<String> {
    dedupe_by_key(fetched)
        .keys()
        .map(|k| k.to_string())
        .collect()
}

/// Partition fetched products against the stored records that share their key.
///
/// Existing records are overwritten field by field (no merge) and moved to
/// `hotel_id` if another hotel owned them.
pub fn plan_upsert(
    hotel_id: Uuid,
    existing: Vec<UpsellProduct>,
    fetched: &[UnifiedProduct],
) -> UpsertPlan {
    let mut existing: HashMap<String, UpsellProduct> = existing
        .into_iter()
        .map(|p| (p.pms_id.clone(), p))
        .collect();

    let mut plan = UpsertPlan::default();
    for (key, product) in dedupe_by_key(fetched) {
        match existing.remove(key) {
            Some(mut stored) => {
                if stored.hotel_id != hotel_id {
                    warn!(
                        pms_id = key,
                        from = %stored.hotel_id,
                        to = %hotel_id,
                        "upsell product changes owner"
                    );
                }
                stored.apply(hotel_id, product);
                plan.updates.push(stored);
            }
            None => plan.creates.push(UpsellProduct::from_unified(hotel_id, product)),
        }
    }
    plan
}

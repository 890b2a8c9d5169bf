//! Unlock ledger
//!
//! Records which gallery/route/ending ids the player has reached, one
//! numbered slot per distinct id within a category.

use crate::types::Unlocks;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlockRecord {
    pub id: Value,
    pub timestamp: DateTime<Utc>,
}

/// Persisted mapping of category → slot index → record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnlockLedger(BTreeMap<String, BTreeMap<u32, UnlockRecord>>);

impl UnlockLedger {
    /// Merge unlock ids into the ledger.
    ///
    /// An id already present anywhere in its category is skipped; a new id
    /// goes into the slot after the highest one in use. Returns whether
    /// anything was added.
    pub fn commit(&mut self, unlocks: &Unlocks, now: DateTime<Utc>) -> bool {
        let mut changed = false;

        for (category, slots) in unlocks {
            let records = self.0.entry(category.clone()).or_default();

            for id in slots.values() {
                if records.values().any(|record| &record.id == id) {
                    log::debug!("Unlock {id} already recorded in '{category}'");
                    continue;
                }

                let slot = records.keys().next_back().map_or(0, |last| last + 1);
                records.insert(
                    slot,
                    UnlockRecord {
                        id: id.clone(),
                        timestamp: now,
                    },
                );
                changed = true;
            }
        }

        changed
    }

    pub fn contains(&self, category: &str, id: &Value) -> bool {
        self.0
            .get(category)
            .is_some_and(|records| records.values().any(|record| &record.id == id))
    }

    pub fn category(&self, category: &str) -> Option<&BTreeMap<u32, UnlockRecord>> {
        self.0.get(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn unlocks(value: Value) -> Unlocks {
        serde_json::from_value(value).unwrap()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn same_id_twice_keeps_one_slot() {
        let mut ledger = UnlockLedger::default();
        assert!(ledger.commit(&unlocks(json!({"cg": {"0": "cg_park"}})), at(1)));
        assert!(!ledger.commit(&unlocks(json!({"cg": {"3": "cg_park"}})), at(2)));

        let cg = ledger.category("cg").unwrap();
        assert_eq!(cg.len(), 1);
        assert_eq!(cg[&0].timestamp, at(1));
    }

    #[test]
    fn distinct_ids_get_increasing_slots() {
        let mut ledger = UnlockLedger::default();
        ledger.commit(&unlocks(json!({"cg": {"0": "cg_park"}})), at(1));
        ledger.commit(&unlocks(json!({"cg": {"0": "cg_cafe"}})), at(2));

        let cg = ledger.category("cg").unwrap();
        assert_eq!(cg[&0].id, json!("cg_park"));
        assert_eq!(cg[&1].id, json!("cg_cafe"));
    }

    #[test]
    fn categories_never_collide() {
        let mut ledger = UnlockLedger::default();
        ledger.commit(
            &unlocks(json!({"cg": {"0": "shared"}, "endings": {"0": "shared"}})),
            at(1),
        );
        assert!(ledger.contains("cg", &json!("shared")));
        assert!(ledger.contains("endings", &json!("shared")));
        assert!(!ledger.contains("routes", &json!("shared")));
    }

    #[test]
    fn several_ids_in_one_commit_are_appended_in_order() {
        let mut ledger = UnlockLedger::default();
        ledger.commit(&unlocks(json!({"music": {"a": "op", "b": "ed", "c": "op"}})), at(1));
        let music = ledger.category("music").unwrap();
        assert_eq!(music.len(), 2);
        assert_eq!(music[&0].id, json!("op"));
        assert_eq!(music[&1].id, json!("ed"));
    }

    #[test]
    fn serializes_with_string_slot_keys() {
        let mut ledger = UnlockLedger::default();
        ledger.commit(&unlocks(json!({"cg": {"0": "cg_park"}})), at(1));
        let value = serde_json::to_value(&ledger).unwrap();
        assert_eq!(value["cg"]["0"]["id"], json!("cg_park"));
        assert_eq!(value["cg"]["0"]["timestamp"], json!("2024-02-14T01:00:00Z"));
    }
}

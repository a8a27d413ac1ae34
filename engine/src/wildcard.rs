//! Wildcard Detector (§4.3, §2 12% share): classifies a subdomain branch as
//! none/static/dynamic by probing with unguessable labels, then exposes a
//! match rule the driver applies to suppress wildcard-echoed names.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::driver::DriverContext;
use crate::model::{Priority, RecordKind, WildcardClass};
use crate::resolve;
use crate::util;

const NUM_WILDCARD_TESTS: usize = 5;
const MAX_NAME_LEN: usize = 253;
const PROBE_SPACING: Duration = Duration::from_secs(1);

/// Per-root cache of subdomain classifications. Entries are write-once: a
/// classification, once computed, is never downgraded or re-probed.
pub struct WildcardDetector {
    entries: RwLock<HashMap<String, Arc<Mutex<Option<WildcardClass>>>>>,
}

impl WildcardDetector {
    pub fn new() -> Self {
        WildcardDetector { entries: RwLock::new(HashMap::new()) }
    }

    /// Classify `sub`, probing at most once: concurrent callers for the
    /// same `sub` serialize on the entry's lock and observe the same
    /// result rather than each launching their own probe.
    pub async fn classify(&self, ctx: &DriverContext, sub: &str) -> WildcardClass {
        let entry = self.entry_for(sub).await;
        let mut slot = entry.lock().await;
        if let Some(class) = slot.as_ref() {
            return class.clone();
        }
        let class = probe(ctx, sub).await;
        *slot = Some(class.clone());
        class
    }

    async fn entry_for(&self, sub: &str) -> Arc<Mutex<Option<WildcardClass>>> {
        let key = sub.to_ascii_lowercase();
        {
            let map = self.entries.read().await;
            if let Some(entry) = map.get(&key) {
                return entry.clone();
            }
        }
        let mut map = self.entries.write().await;
        map.entry(key).or_insert_with(|| Arc::new(Mutex::new(None))).clone()
    }

    /// §4.3 match rule, evaluated against every suffix between `name`
    /// (exclusive) and `root` (inclusive): a match at any level suppresses
    /// the whole request.
    pub async fn matches(&self, ctx: &DriverContext, name: &str, root: &str, answer_data: &[String]) -> bool {
        for sub in util::suffixes_between(name, root) {
            let class = self.classify(ctx, &sub).await;
            if matches(&class, answer_data) {
                return true;
            }
        }
        false
    }
}

impl Default for WildcardDetector {
    fn default() -> Self {
        WildcardDetector::new()
    }
}

fn matches(class: &WildcardClass, answer_data: &[String]) -> bool {
    match class {
        WildcardClass::None => false,
        WildcardClass::Dynamic => true,
        WildcardClass::Static(expected) => {
            answer_data.is_empty() || answer_data.iter().any(|d| expected.iter().any(|e| e.eq_ignore_ascii_case(d)))
        }
    }
}

async fn probe(ctx: &DriverContext, sub: &str) -> WildcardClass {
    let mut sets: Vec<Vec<String>> = Vec::with_capacity(NUM_WILDCARD_TESTS);

    for i in 0..NUM_WILDCARD_TESTS {
        let Some(label) = util::unlikely_name(sub, MAX_NAME_LEN) else {
            return WildcardClass::Dynamic;
        };
        let probe_name = format!("{label}.{sub}");

        let mut data = Vec::new();
        for kind in [RecordKind::Cname, RecordKind::A, RecordKind::Aaaa] {
            let _permit = ctx.acquire_dns().await;
            let result = resolve::resolve(&ctx.pool, &probe_name, kind, Priority::Critical).await;
            drop(_permit);
            match result {
                Ok(answers) => data.extend(answers.into_iter().map(|a| a.data)),
                Err(err) if err.rcode == crate::error::Rcode::TRANSPORT => return WildcardClass::Dynamic,
                Err(_) => {} // terminal rcode (e.g. NXDOMAIN): no records of this type
            }
        }
        data.sort();
        sets.push(data);

        if i + 1 < NUM_WILDCARD_TESTS {
            tokio::time::sleep(PROBE_SPACING).await;
        }
    }

    if sets.iter().all(|s| s.is_empty()) {
        return WildcardClass::None;
    }

    let first = &sets[0];
    if !first.is_empty() && sets.iter().all(|s| *s == *first) {
        return WildcardClass::Static(first.clone());
    }

    WildcardClass::Dynamic
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_rule_none_never_suppresses() {
        assert!(!matches(&WildcardClass::None, &["1.2.3.4".to_string()]));
        assert!(!matches(&WildcardClass::None, &[]));
    }

    #[test]
    fn match_rule_dynamic_always_suppresses() {
        assert!(matches(&WildcardClass::Dynamic, &[]));
        assert!(matches(&WildcardClass::Dynamic, &["1.2.3.4".to_string()]));
    }

    #[test]
    fn match_rule_static_matches_shared_data_or_empty_answers() {
        let class = WildcardClass::Static(vec!["1.2.3.4".to_string()]);
        assert!(matches(&class, &["1.2.3.4".to_string()]));
        assert!(matches(&class, &[])); // empty answer set also counts as a match
        assert!(!matches(&class, &["5.6.7.8".to_string()]));
    }

    #[tokio::test]
    async fn classification_is_cached_across_calls() {
        let detector = WildcardDetector::new();
        let entry = detector.entry_for("example.com").await;
        *entry.lock().await = Some(WildcardClass::None);

        let entry_again = detector.entry_for("example.com").await;
        assert!(Arc::ptr_eq(&entry, &entry_again));
    }
}

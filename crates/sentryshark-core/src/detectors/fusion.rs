use std::collections::HashMap;

use super::Detection;

/// Priority order for picking a detection's dedup key out of its evidence
/// map. A detector wishing to be fused by a new key must emit one of these
/// field names (spec.md's fusion contract).
const PRIMARY_EVIDENCE_KEYS: [&str; 4] = ["ip", "source_ip", "domain", "flow_key"];

fn primary_evidence_key(detection: &Detection) -> String {
    for key in PRIMARY_EVIDENCE_KEYS {
        if let Some(value) = detection.evidence.get(key) {
            return match value.as_str() {
                Some(s) => s.to_string(),
                None => value.to_string(),
            };
        }
    }
    String::new()
}

/// Deduplicates detections by `(label, primary_evidence_key)`, keeping the
/// maximum-score survivor of each group. Ties prefer the earliest
/// `timestamp`. The input order is otherwise preserved: the first time a
/// group is seen fixes its position in the output.
///
/// Idempotent: fusing an already-fused list returns it unchanged (every
/// group already has exactly one member, so there is nothing left to
/// collapse).
pub fn fuse(detections: Vec<Detection>) -> Vec<Detection> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Detection> = HashMap::new();

    for detection in detections {
        let key = format!("{}\u{0}{}", detection.label, primary_evidence_key(&detection));
        match groups.get_mut(&key) {
            None => {
                order.push(key.clone());
                groups.insert(key, detection);
            }
            Some(existing) => {
                let replace = detection.score > existing.score
                    || (detection.score == existing.score
                        && detection.timestamp < existing.timestamp);
                if replace {
                    *existing = detection;
                }
            }
        }
    }

    order
        .into_iter()
        .map(|key| groups.remove(&key).expect("key was just inserted"))
        .collect()
}

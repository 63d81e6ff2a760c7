//! Inversion of the page → contribution map into user → page ids.

use std::collections::{BTreeMap, HashMap};

use contribsync_shared::Contribution;

/// Group page ids by owning user.
///
/// A page with several owners is listed under each of them; blank owner
/// entries are ignored. Users come out in key order and each user's page ids
/// are sorted and deduplicated, so logs stay reproducible across runs.
pub fn group_by_user(contributions: &HashMap<String, Contribution>) -> BTreeMap<String, Vec<String>> {
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (page_id, contribution) in contributions {
        for user_id in contribution.users.iter().filter(|u| !u.trim().is_empty()) {
            groups
                .entry(user_id.clone())
                .or_default()
                .push(page_id.clone());
        }
    }
    for page_ids in groups.values_mut() {
        page_ids.sort();
        page_ids.dedup();
    }
    groups
}

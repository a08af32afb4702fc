//! crates/party_content_core/src/merge.rs
//!
//! Reconciles locally cached content with content fetched from the remote store.

use std::collections::HashSet;

use crate::domain::ContentItem;

/// Merges two lists by id. Local entries win over remote entries sharing an id,
/// and come first; remote-only items are appended in their original order.
/// Duplicate ids within either list collapse to their first occurrence.
pub fn merge_content(local: Vec<ContentItem>, remote: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen = HashSet::with_capacity(local.len() + remote.len());
    local
        .into_iter()
        .chain(remote)
        .filter(|item| seen.insert(item.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentId, ContentPayload};
    use chrono::Utc;
    use proptest::prelude::*;

    fn pair(id: &str, left: &str) -> ContentItem {
        ContentItem {
            id: ContentId::new(id),
            is_custom: true,
            owner_id: None,
            payload: ContentPayload::Pair {
                left: left.to_string(),
                right: "Other".to_string(),
            },
            created_at: Utc::now(),
        }
    }

    fn ids(items: &[ContentItem]) -> Vec<&str> {
        items.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn local_copy_wins_on_conflict() {
        let local = pair("1", "Local");
        let remote = pair("1", "Remote");
        assert_eq!(merge_content(vec![local.clone()], vec![remote]), vec![local]);
    }

    #[test]
    fn remote_only_items_follow_local_items() {
        let merged = merge_content(
            vec![pair("2", "b"), pair("1", "a")],
            vec![pair("3", "c"), pair("1", "x"), pair("4", "d")],
        );
        assert_eq!(ids(&merged), vec!["2", "1", "3", "4"]);
    }

    proptest! {
        #[test]
        fn merging_a_list_with_itself_is_idempotent(raw in proptest::collection::vec("[0-9]{1,2}", 0..20)) {
            let list: Vec<ContentItem> = raw.iter().map(|id| pair(id, id)).collect();
            let merged = merge_content(list.clone(), list.clone());

            let unique: HashSet<&str> = ids(&merged).into_iter().collect();
            prop_assert_eq!(unique.len(), merged.len());
            let expected: HashSet<&str> = ids(&list).into_iter().collect();
            prop_assert_eq!(unique, expected);
        }

        #[test]
        fn every_local_item_survives(
            local_ids in proptest::collection::hash_set("[0-9]{1,2}", 0..10),
            remote_ids in proptest::collection::vec("[0-9]{1,2}", 0..10),
        ) {
            let local: Vec<ContentItem> = local_ids.iter().map(|id| pair(id, "local")).collect();
            let remote: Vec<ContentItem> = remote_ids.iter().map(|id| pair(id, "remote")).collect();
            let merged = merge_content(local.clone(), remote);
            prop_assert_eq!(&merged[..local.len()], &local[..]);
        }
    }
}

//! crates/party_content_core/src/ownership.rs
//!
//! Decides which `created_by` filter applies for a session and whether a session
//! may mutate an item. No I/O.

use crate::domain::{ContentItem, SessionState, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerFilter {
    MatchesUser(UserId),
    /// Anonymous and signed-out sessions own rows tagged with a null owner.
    MatchesNull,
}

impl OwnerFilter {
    pub fn matches(&self, owner: Option<&UserId>) -> bool {
        match (self, owner) {
            (OwnerFilter::MatchesUser(expected), Some(actual)) => expected == actual,
            (OwnerFilter::MatchesNull, None) => true,
            _ => false,
        }
    }

    /// The owner value to write on insert.
    pub fn owner_tag(&self) -> Option<&UserId> {
        match self {
            OwnerFilter::MatchesUser(id) => Some(id),
            OwnerFilter::MatchesNull => None,
        }
    }
}

pub fn owner_filter_for(session: &SessionState) -> OwnerFilter {
    match session {
        SessionState::Authenticated(id) => OwnerFilter::MatchesUser(id.clone()),
        SessionState::Anonymous(_) | SessionState::Unauthenticated => OwnerFilter::MatchesNull,
    }
}

/// Built-in content is never mutable.
pub fn can_mutate(item: &ContentItem, session: &SessionState) -> bool {
    item.is_custom && owner_filter_for(session).matches(item.owner_id.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentId, ContentPayload};
    use chrono::Utc;
    use proptest::prelude::*;

    fn item(is_custom: bool, owner: Option<&str>) -> ContentItem {
        ContentItem {
            id: ContentId::new("42"),
            is_custom,
            owner_id: owner.map(UserId::new),
            payload: ContentPayload::Theme {
                name: "Animals".to_string(),
                words: vec!["cat".to_string()],
            },
            created_at: Utc::now(),
        }
    }

    fn session_strategy() -> impl Strategy<Value = SessionState> {
        prop_oneof![
            "[a-c]".prop_map(|id| SessionState::Anonymous(UserId::new(id))),
            "[a-c]".prop_map(|id| SessionState::Authenticated(UserId::new(id))),
            Just(SessionState::Unauthenticated),
        ]
    }

    #[test]
    fn filters_follow_session_state() {
        let user = UserId::new("a");
        assert_eq!(
            owner_filter_for(&SessionState::Authenticated(user.clone())),
            OwnerFilter::MatchesUser(user.clone())
        );
        assert_eq!(owner_filter_for(&SessionState::Anonymous(user)), OwnerFilter::MatchesNull);
        assert_eq!(owner_filter_for(&SessionState::Unauthenticated), OwnerFilter::MatchesNull);
    }

    #[test]
    fn other_users_items_are_not_mutable() {
        let session = SessionState::Authenticated(UserId::new("a"));
        assert!(!can_mutate(&item(true, Some("b")), &session));
        assert!(can_mutate(&item(true, Some("a")), &session));
        assert!(!can_mutate(&item(true, None), &session));
    }

    proptest! {
        #[test]
        fn custom_ownership_matches_session(
            session in session_strategy(),
            owner in proptest::option::of("[a-c]"),
        ) {
            let it = item(true, owner.as_deref());
            let expected = match &session {
                SessionState::Authenticated(u) => owner.as_deref() == Some(u.as_str()),
                SessionState::Anonymous(_) | SessionState::Unauthenticated => owner.is_none(),
            };
            prop_assert_eq!(can_mutate(&it, &session), expected);
        }

        #[test]
        fn built_in_content_is_never_mutable(
            session in session_strategy(),
            owner in proptest::option::of("[a-c]"),
        ) {
            prop_assert!(!can_mutate(&item(false, owner.as_deref()), &session));
        }
    }
}

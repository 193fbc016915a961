use crate::error::ApiError;

pub const DEFAULT_FEED_LIMIT: i64 = 10;

/// The three feed modes share one selection shape; only the filter and the
/// limit differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMode {
    /// Most recent posts, unfiltered.
    Default,
    /// "The Right Now": the single newest post in the whole system. This is
    /// a different question from search, so a search query never applies.
    Spotlight,
    /// Posts whose text contains the query, case-insensitively.
    Search(String),
}

#[derive(Debug, PartialEq, Eq)]
pub struct FeedPlan {
    pub text_filter: Option<String>,
    pub limit: i64,
}

/// An empty or whitespace-only query is treated as absent and falls back to
/// the unfiltered default feed.
pub fn resolve_mode(right_now: bool, search_query: Option<&str>) -> FeedMode {
    if right_now {
        return FeedMode::Spotlight;
    }
    match search_query.map(str::trim) {
        Some(q) if !q.is_empty() => FeedMode::Search(q.to_string()),
        _ => FeedMode::Default,
    }
}

/// Turn a mode plus the caller's explicit limit into the store selection.
/// A non-positive limit is rejected outright, never clamped. Spotlight
/// always selects exactly one post, whatever limit was asked for.
pub fn plan(mode: FeedMode, requested_limit: Option<i64>) -> Result<FeedPlan, ApiError> {
    match requested_limit {
        Some(limit) if limit <= 0 => {
            return Err(ApiError::validation("invalid 'limit' parameter"));
        }
        _ => {}
    }

    Ok(match mode {
        FeedMode::Spotlight => FeedPlan {
            text_filter: None,
            limit: 1,
        },
        FeedMode::Default => FeedPlan {
            text_filter: None,
            limit: requested_limit.unwrap_or(DEFAULT_FEED_LIMIT),
        },
        FeedMode::Search(query) => FeedPlan {
            text_filter: Some(query),
            limit: requested_limit.unwrap_or(DEFAULT_FEED_LIMIT),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_takes_ten() {
        let plan = plan(FeedMode::Default, None).unwrap();
        assert_eq!(plan, FeedPlan { text_filter: None, limit: 10 });
    }

    #[test]
    fn explicit_limit_is_honored() {
        let plan = plan(FeedMode::Default, Some(25)).unwrap();
        assert_eq!(plan.limit, 25);
    }

    #[test]
    fn spotlight_selects_exactly_one_and_ignores_query() {
        // A search query alongside rightNow never reaches the filter.
        assert_eq!(resolve_mode(true, Some("party")), FeedMode::Spotlight);

        // Even an explicit larger limit cannot widen the spotlight.
        let plan = plan(FeedMode::Spotlight, Some(50)).unwrap();
        assert_eq!(plan, FeedPlan { text_filter: None, limit: 1 });
    }

    #[test]
    fn search_mode_carries_the_query() {
        assert_eq!(
            resolve_mode(false, Some("pizza")),
            FeedMode::Search("pizza".into())
        );
        let plan = plan(FeedMode::Search("pizza".into()), None).unwrap();
        assert_eq!(plan.text_filter.as_deref(), Some("pizza"));
        assert_eq!(plan.limit, 10);
    }

    #[test]
    fn empty_query_falls_back_to_default_feed() {
        assert_eq!(resolve_mode(false, Some("")), FeedMode::Default);
        assert_eq!(resolve_mode(false, Some("   ")), FeedMode::Default);
        assert_eq!(resolve_mode(false, None), FeedMode::Default);
    }

    #[test]
    fn non_positive_limits_are_rejected_not_clamped() {
        assert!(plan(FeedMode::Default, Some(0)).is_err());
        assert!(plan(FeedMode::Default, Some(-3)).is_err());
        assert!(plan(FeedMode::Spotlight, Some(0)).is_err());
    }
}

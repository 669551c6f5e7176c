//! Targeting predicate over a request context.

use adserve_core::types::{Ad, RequestContext, Targeting};

use crate::glob::glob_match;

/// Whether `ad` matches the request `ctx`.
///
/// An ad with no targeting block matches everything. When `url_patterns`
/// is present it is evaluated exclusively: the context URL must match at
/// least one pattern, and the post-type/category rules are never consulted
/// — even on a URL miss. This mirrors the long-standing production
/// precedence; see DESIGN.md before changing it.
pub fn matches(ad: &Ad, ctx: &RequestContext) -> bool {
    let Some(targeting) = &ad.targeting else {
        return true;
    };
    matches_rules(targeting, ctx)
}

fn matches_rules(targeting: &Targeting, ctx: &RequestContext) -> bool {
    if let Some(patterns) = &targeting.url_patterns {
        return patterns.iter().any(|p| glob_match(p, &ctx.url));
    }

    if let (Some(post_types), Some(post_type)) = (&targeting.post_types, &ctx.post_type) {
        return post_types.contains(post_type);
    }

    if let (Some(categories), Some(ctx_categories)) = (&targeting.categories, &ctx.categories) {
        return categories.iter().any(|c| ctx_categories.contains(c));
    }

    // Targeting present but none of its rules apply to this context.
    true
}

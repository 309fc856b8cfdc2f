//! Store-independent ranking: everything here works on typed rows already
//! fetched from the database, so scoring and tie-break rules can be tested
//! without a live store.

pub mod recommend;
pub mod search;

pub use recommend::{favorite_tokens, rank_recommendations, top_tokens_per_show};
pub use search::{plan_query, rank_candidates, QueryPlan};

//! Document keys.

pub const IDENTITY: &str = "identity";
pub const FAVORITE_IDS: &str = "favorites";
pub const FAVORITE_DETAILS: &str = "favorites_details";
/// Pre-mutation copy of both favorites halves while a dual write is in flight.
pub const FAVORITES_JOURNAL: &str = "favorites_journal";
pub const RATINGS: &str = "ratings";

const FEEDBACK_PREFIX: &str = "feedback:";

/// Key of the comment thread for one entity.
pub fn feedback(entity_id: &str) -> String {
    format!("{}{}", FEEDBACK_PREFIX, entity_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_key_embeds_entity_id() {
        assert_eq!(feedback("42"), "feedback:42");
    }
}

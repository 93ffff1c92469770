/// Upsert key for a Canvas item, e.g. `100:501`.
///
/// Both parts are decimal integers and `:` is never a digit, so distinct
/// `(course_id, item_id)` pairs always give distinct keys. Title and due date
/// are deliberately absent: they change without the item changing identity.
pub fn key_for(course_id: u64, item_id: u64) -> String {
    format!("{}:{}", course_id, item_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn key_joins_course_and_item_ids() {
        assert_eq!(key_for(100, 501), "100:501");
    }

    #[test]
    fn key_is_stable_across_calls() {
        assert_eq!(key_for(224756, 9_000_001), key_for(224756, 9_000_001));
    }

    #[test]
    fn key_does_not_collide_on_digit_boundaries() {
        let pairs = [(1, 23), (12, 3), (123, 0), (0, 123), (10, 1), (1, 1)];
        let keys: HashSet<String> = pairs.iter().map(|(c, i)| key_for(*c, *i)).collect();
        assert_eq!(keys.len(), pairs.len());
    }
}

//! Record ID generation.
//!
//! Every record uses a UUID v7: unique without coordination between branches and
//! ordered by creation time, so `ORDER BY id` matches insertion order.

use uuid::Uuid;

/// Generate a new time-ordered record ID.
pub fn generate_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn test_ids_are_time_sortable() {
        let id1 = generate_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = generate_id();
        assert!(id1 < id2);
        assert_eq!(id2.get_version_num(), 7);
    }
}

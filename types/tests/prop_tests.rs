use proptest::prelude::*;

use faceguard_types::{RetentionPolicy, Timestamp, UserRecord};

proptest! {
    /// Timestamp ordering: new(a) <= new(b) iff a <= b.
    #[test]
    fn timestamp_ordering(a in 0u64..u64::MAX, b in 0u64..u64::MAX) {
        let ta = Timestamp::new(a);
        let tb = Timestamp::new(b);
        prop_assert_eq!(ta <= tb, a <= b);
        prop_assert_eq!(ta == tb, a == b);
    }

    /// Timestamp elapsed_since saturates to 0 when now < self.
    #[test]
    fn timestamp_elapsed_since_saturates(
        base in 1u64..1_000_000,
        deficit in 1u64..1_000_000,
    ) {
        let later = Timestamp::new(base + deficit);
        let earlier = Timestamp::new(base);
        prop_assert_eq!(later.elapsed_since(earlier), 0);
    }

    /// Timestamp has_expired agrees with manual arithmetic.
    #[test]
    fn timestamp_has_expired_correct(
        start in 0u64..500_000,
        duration in 1u64..500_000,
        offset in 0u64..1_000_000,
    ) {
        let t = Timestamp::new(start);
        let now = Timestamp::new(start.saturating_add(offset));
        prop_assert_eq!(t.has_expired(duration, now), offset >= duration);
    }

    /// Retention never expires before its configured number of days.
    #[test]
    fn retention_never_expires_early(
        created in 0u64..1_000_000_000,
        days in 1u64..3650,
        offset in 0u64..86_400_000,
    ) {
        let policy = RetentionPolicy::starting_at(Timestamp::new(created), days);
        let before = Timestamp::new(created).plus_days(days - 1).plus_millis(offset);
        prop_assert!(!policy.is_expired(before));
    }

    /// Binding the same fingerprint repeatedly keeps a single device entry.
    #[test]
    fn device_binding_is_idempotent(fp in "[a-z0-9]{1,16}", times in 1usize..8) {
        let mut user = UserRecord::new("u", "t", "r", 30, Timestamp::new(0));
        for i in 0..times {
            user.bind_device(Some(&fp), None, Timestamp::new(i as u64));
        }
        prop_assert_eq!(user.trusted_devices.len(), 1);
    }
}

//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::keyed::DefaultKeyedStateStore,
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use uuid::Uuid;

/// Per-user rate limiter type alias
pub type UserLimiter = RateLimiter<Uuid, DefaultKeyedStateStore<Uuid>, DefaultClock>;

/// Create a per-user limiter allowing `requests_per_minute`, with the whole
/// minute's allowance available as a burst
pub fn create_user_limiter(requests_per_minute: u32) -> Arc<UserLimiter> {
    let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

/// Rate limits applied to expensive endpoints
#[derive(Clone)]
pub struct RateLimits {
    chat: Arc<UserLimiter>,
    import: Arc<UserLimiter>,
}

impl RateLimits {
    pub fn new(chat_per_minute: u32, import_per_minute: u32) -> Self {
        Self {
            chat: create_user_limiter(chat_per_minute),
            import: create_user_limiter(import_per_minute),
        }
    }

    /// Check if a chat message is allowed (returns true if allowed)
    pub fn check_chat(&self, user_id: Uuid) -> bool {
        self.chat.check_key(&user_id).is_ok()
    }

    /// Check if a CSV import is allowed (returns true if allowed)
    pub fn check_import(&self, user_id: Uuid) -> bool {
        self.import.check_key(&user_id).is_ok()
    }

    /// Drop users whose quota has fully refilled
    pub fn retain_recent(&self) {
        for limiter in [&self.chat, &self.import] {
            limiter.retain_recent();
            limiter.shrink_to_fit();
        }
    }

    /// Users currently tracked by either limiter
    pub fn tracked_keys(&self) -> usize {
        self.chat.len() + self.import.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_quota_is_per_user() {
        let limits = RateLimits::new(2, 1);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        assert!(limits.check_chat(alice));
        assert!(limits.check_chat(alice));
        assert!(!limits.check_chat(alice));

        assert!(limits.check_chat(bob));
    }

    #[test]
    fn import_and_chat_quotas_are_independent() {
        let limits = RateLimits::new(1, 1);
        let user = Uuid::new_v4();

        assert!(limits.check_import(user));
        assert!(!limits.check_import(user));
        assert!(limits.check_chat(user));
    }

    #[test]
    fn refilled_users_are_forgotten() {
        // at this rate a used cell refills within nanoseconds
        let limits = RateLimits::new(u32::MAX, u32::MAX);
        limits.check_chat(Uuid::new_v4());
        limits.check_import(Uuid::new_v4());
        assert_eq!(limits.tracked_keys(), 2);

        std::thread::sleep(std::time::Duration::from_millis(5));
        limits.retain_recent();
        assert_eq!(limits.tracked_keys(), 0);
    }

    #[test]
    fn throttled_users_are_kept() {
        let limits = RateLimits::new(1, 1);
        let user = Uuid::new_v4();
        assert!(limits.check_chat(user));

        limits.retain_recent();
        assert_eq!(limits.tracked_keys(), 1);
        assert!(!limits.check_chat(user));
    }

    #[test]
    fn zero_quota_falls_back_to_one() {
        let limiter = create_user_limiter(0);
        let user = Uuid::new_v4();
        assert!(limiter.check_key(&user).is_ok());
        assert!(limiter.check_key(&user).is_err());
    }
}

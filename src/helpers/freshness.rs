//! Freshness policy.
//!
//! Maps the scope a request targets to the maximum age a cached record may
//! have before it is served as stale and refreshed.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Aggregate over every world and player.
    Server,
    /// Aggregate over one world.
    World,
    /// Aggregate over one player, all worlds.
    Player,
    /// Aggregate over one player in one world.
    PlayerInWorld,
    PlayerList,
    WorldList,
}

impl Scope {
    pub fn max_age(&self) -> Duration {
        match self {
            Scope::Server => Duration::days(7),
            Scope::World => Duration::days(3),
            Scope::Player => Duration::days(2),
            Scope::PlayerInWorld => Duration::days(1),
            Scope::PlayerList => Duration::minutes(15),
            Scope::WorldList => Duration::hours(1),
        }
    }

    /// Strict: a record written exactly `max_age` ago is stale.
    pub fn is_fresh(&self, timestamp: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        timestamp > now - self.max_age()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_table() {
        assert_eq!(Scope::Server.max_age(), Duration::days(7));
        assert_eq!(Scope::World.max_age(), Duration::days(3));
        assert_eq!(Scope::Player.max_age(), Duration::days(2));
        assert_eq!(Scope::PlayerInWorld.max_age(), Duration::days(1));
        assert_eq!(Scope::PlayerList.max_age(), Duration::minutes(15));
        assert_eq!(Scope::WorldList.max_age(), Duration::hours(1));
    }

    #[test]
    fn test_boundary_is_stale() {
        let now = Utc::now();

        for scope in [
            Scope::Server,
            Scope::World,
            Scope::Player,
            Scope::PlayerInWorld,
            Scope::PlayerList,
            Scope::WorldList,
        ] {
            let boundary = now - scope.max_age();
            assert!(!scope.is_fresh(boundary, now), "{:?}", scope);
            assert!(
                scope.is_fresh(boundary + Duration::milliseconds(1), now),
                "{:?}",
                scope
            );
            assert!(!scope.is_fresh(boundary - Duration::seconds(1), now));
        }
    }
}

//! Connection keys: `"<userId>-<roomId>"` or `"<userId>-global"`.

use std::fmt;
use std::str::FromStr;

/// What a connection listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionScope {
    /// A single room's events.
    Room(i64),
    /// Every room's events, for unread badges.
    Global,
}

/// Registry key identifying one open stream.
///
/// One user can hold one stream per room plus one global stream; opening a
/// second stream with the same key replaces the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub user_id: i64,
    pub scope: ConnectionScope,
}

impl ConnectionKey {
    pub fn room(user_id: i64, room_id: i64) -> Self {
        Self {
            user_id,
            scope: ConnectionScope::Room(room_id),
        }
    }

    pub fn global(user_id: i64) -> Self {
        Self {
            user_id,
            scope: ConnectionScope::Global,
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope == ConnectionScope::Global
    }

    /// True when this key is scoped to exactly `room_id`.
    pub fn is_room(&self, room_id: i64) -> bool {
        self.scope == ConnectionScope::Room(room_id)
    }
}

impl fmt::Display for ConnectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            ConnectionScope::Room(room_id) => write!(f, "{}-{}", self.user_id, room_id),
            ConnectionScope::Global => write!(f, "{}-global", self.user_id),
        }
    }
}

impl FromStr for ConnectionKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (user, scope) = s
            .rsplit_once('-')
            .ok_or_else(|| format!("invalid connection key: '{s}'"))?;
        let user_id = user
            .parse::<i64>()
            .map_err(|_| format!("invalid user id in connection key: '{s}'"))?;

        if scope == "global" {
            return Ok(ConnectionKey::global(user_id));
        }

        let room_id = scope
            .parse::<i64>()
            .map_err(|_| format!("invalid room id in connection key: '{s}'"))?;
        Ok(ConnectionKey::room(user_id, room_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_wire_convention() {
        assert_eq!(ConnectionKey::room(1, 5).to_string(), "1-5");
        assert_eq!(ConnectionKey::global(3).to_string(), "3-global");
    }

    #[test]
    fn test_parse_room_and_global() {
        assert_eq!("1-5".parse::<ConnectionKey>().unwrap(), ConnectionKey::room(1, 5));
        assert_eq!(
            "3-global".parse::<ConnectionKey>().unwrap(),
            ConnectionKey::global(3)
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("global".parse::<ConnectionKey>().is_err());
        assert!("abc-5".parse::<ConnectionKey>().is_err());
        assert!("1-room".parse::<ConnectionKey>().is_err());
    }

    #[test]
    fn test_room_match_is_exact() {
        // "1-15" must not be treated as a listener for room 5.
        let key = ConnectionKey::room(1, 15);
        assert!(!key.is_room(5));
        assert!(key.is_room(15));
        assert!(!key.is_global());
    }
}

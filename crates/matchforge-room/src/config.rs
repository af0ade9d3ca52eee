//! Room configuration.

use std::time::Duration;

use serde_json::Value;

/// Capacity limits, id shape, and lifecycle delays for rooms.
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Capacity used when a request doesn't name one (and for quick-play rooms).
    pub default_max_players: usize,
    /// Smallest capacity a room can be created with.
    pub min_players: usize,
    /// Largest capacity a room can be created with.
    pub max_players_cap: usize,
    /// Length of generated room ids.
    pub room_id_len: usize,
    /// How long a room may sit in `waiting` before it is force-closed.
    pub waiting_timeout: Duration,
    /// Grace period between a room emptying and its destruction.
    pub cleanup_delay: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            default_max_players: 4,
            min_players: 2,
            max_players_cap: 16,
            room_id_len: 6,
            waiting_timeout: Duration::from_secs(5 * 60),
            cleanup_delay: Duration::from_secs(10),
        }
    }
}

impl RoomConfig {
    /// Fixes out-of-range values so the config is safe to use.
    ///
    /// - `min_players` is at least 1 and `max_players_cap` at least `min_players`.
    /// - `default_max_players` is clamped into `min_players..=max_players_cap`.
    /// - `room_id_len` is at least 1.
    pub fn validated(mut self) -> Self {
        if self.min_players == 0 {
            tracing::warn!("min_players of 0 raised to 1");
            self.min_players = 1;
        }
        if self.max_players_cap < self.min_players {
            tracing::warn!(
                cap = self.max_players_cap,
                min = self.min_players,
                "max_players_cap below min_players, raising"
            );
            self.max_players_cap = self.min_players;
        }
        self.default_max_players = self
            .default_max_players
            .clamp(self.min_players, self.max_players_cap);
        if self.room_id_len == 0 {
            tracing::warn!("room_id_len of 0 raised to 1");
            self.room_id_len = 1;
        }
        self
    }

    /// Turns a client-supplied `maxPlayers` into a capacity.
    ///
    /// Numbers are truncated toward zero and numeric strings are read up to
    /// their first non-digit. A missing, zero, or unreadable value means
    /// `default_max_players`. The result is clamped to
    /// `min_players..=max_players_cap`.
    pub fn clamp_max_players(&self, raw: Option<&Value>) -> usize {
        let requested = match raw {
            Some(Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
            Some(Value::String(s)) => parse_leading_int(s),
            _ => None,
        };

        match requested {
            None | Some(0) => self.default_max_players,
            Some(n) => {
                let min = self.min_players as i64;
                let max = self.max_players_cap as i64;
                n.clamp(min, max) as usize
            }
        }
    }
}

/// Reads an optionally signed run of leading digits, skipping leading whitespace.
fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    // Saturate absurdly long digit runs; they clamp to the cap anyway.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

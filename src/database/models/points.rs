//! Point tally models.

use serde::{Deserialize, Serialize};

fn default_increment() -> u64 {
    1
}

/// Point tally of one group member (stored in `point_balances`).
///
/// Created together with the [`GroupMember`](super::GroupMember) and removed
/// with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointBalance {
    pub group_id: i64,
    pub user_id: u64,
    #[serde(default)]
    pub points: u64,
    /// How many points this member gives or takes per `+`/`-`.
    #[serde(default = "default_increment")]
    pub increment: u64,
}

impl PointBalance {
    pub fn new(group_id: i64, user_id: u64) -> Self {
        Self {
            group_id,
            user_id,
            points: 0,
            increment: default_increment(),
        }
    }

    pub fn credit(&mut self, amount: u64) {
        self.points = self.points.saturating_add(amount);
    }

    /// Take points away, never going below zero.
    pub fn debit(&mut self, amount: u64) {
        self.points = self.points.saturating_sub(amount);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_floors_at_zero() {
        let mut balance = PointBalance::new(-100, 1);
        balance.credit(3);
        balance.debit(2);
        assert_eq!(balance.points, 1);
        balance.debit(5);
        assert_eq!(balance.points, 0);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let balance: PointBalance =
            serde_json::from_str(r#"{"group_id": -100, "user_id": 9}"#).unwrap();
        assert_eq!(balance.points, 0);
        assert_eq!(balance.increment, 1);
    }
}

//! Per-room proximity grouping: assigns each player a `group_id` such that
//! two players share a group iff they are transitively within
//! [`PROXIMITY_RADIUS`] of each other.
//!
//! No direct teacher analog exists for spatial grouping (signal-fish-server
//! tracks room membership, not positions), so the union-find structure here
//! is built fresh in the house idiom: plain structs over `HashMap`, no
//! unnecessary trait abstraction, `#[cfg(test)] mod tests` at the bottom
//! with both example-based and proptest-based coverage, matching the
//! density of `protocol/validation.rs` in the teacher.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// Two players within this many coordinate units of each other are
/// considered adjacent; proximity groups are the transitive closure.
pub const PROXIMITY_RADIUS: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f64,
    y: f64,
}

impl Position {
    fn within_radius(&self, other: &Position) -> bool {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt() <= PROXIMITY_RADIUS
    }
}

/// Union-find over the players currently tracked by one room's index.
struct UnionFind {
    parent: HashMap<Uuid, Uuid>,
}

impl UnionFind {
    fn new(members: impl IntoIterator<Item = Uuid>) -> Self {
        let parent = members.into_iter().map(|id| (id, id)).collect();
        Self { parent }
    }

    fn find(&mut self, id: Uuid) -> Uuid {
        let parent = self.parent[&id];
        if parent == id {
            return id;
        }
        let root = self.find(parent);
        self.parent.insert(id, root);
        root
    }

    fn union(&mut self, a: Uuid, b: Uuid) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        // Tie-break deterministically so the eventual component
        // representative computation (lexicographically smallest member)
        // doesn't depend on union order.
        if root_a < root_b {
            self.parent.insert(root_b, root_a);
        } else {
            self.parent.insert(root_a, root_b);
        }
    }
}

/// Maintains proximity group assignments for one room.
///
/// `Insert`/`Remove`/`Move` each trigger a full incremental recomputation —
/// an O(n) scan against the room's current membership is the algorithm the
/// spec pins, appropriate for room sizes in the tens to low hundreds.
#[derive(Debug, Default)]
pub struct ProximityIndex {
    positions: HashMap<Uuid, (f64, f64)>,
    /// Last-assigned group id per player; `None` means "no group" (solo).
    groups: HashMap<Uuid, Option<Uuid>>,
}

impl ProximityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current group id for `player`, or `None` if absent or solo.
    pub fn group_of(&self, player: Uuid) -> Option<Uuid> {
        self.groups.get(&player).copied().flatten()
    }

    /// Adds `player` at `(x, y)` and recomputes groups. Returns the set of
    /// players (including possibly `player` itself) whose group changed.
    pub fn insert(&mut self, player: Uuid, x: f64, y: f64) -> HashSet<Uuid> {
        self.positions.insert(player, (x, y));
        self.groups.entry(player).or_insert(None);
        self.recompute()
    }

    /// Removes `player` from this room's index. Returns the set of players
    /// whose group changed as a result (may leave the former group empty).
    pub fn remove(&mut self, player: Uuid) -> HashSet<Uuid> {
        self.positions.remove(&player);
        self.groups.remove(&player);
        self.recompute()
    }

    /// Updates `player`'s position and recomputes groups.
    pub fn move_player(&mut self, player: Uuid, x: f64, y: f64) -> HashSet<Uuid> {
        self.positions.insert(player, (x, y));
        self.recompute()
    }

    /// Rebuilds the edge set over current membership, unions connected
    /// players, assigns the lexicographically-smallest member of each
    /// component of size ≥ 2 as its representative, and diffs against the
    /// prior assignment to produce the changed-player set.
    fn recompute(&mut self) -> HashSet<Uuid> {
        let members: Vec<Uuid> = self.positions.keys().copied().collect();
        let mut uf = UnionFind::new(members.iter().copied());

        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let a = members[i];
                let b = members[j];
                let pos_a = Position {
                    x: self.positions[&a].0,
                    y: self.positions[&a].1,
                };
                let pos_b = Position {
                    x: self.positions[&b].0,
                    y: self.positions[&b].1,
                };
                if pos_a.within_radius(&pos_b) {
                    uf.union(a, b);
                }
            }
        }

        let mut component_members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for &member in &members {
            let root = uf.find(member);
            component_members.entry(root).or_default().push(member);
        }

        let mut new_groups: HashMap<Uuid, Option<Uuid>> = HashMap::new();
        for (_, members_in_component) in component_members {
            let group_id = if members_in_component.len() >= 2 {
                Some(*members_in_component.iter().min().expect("non-empty component"))
            } else {
                None
            };
            for member in members_in_component {
                new_groups.insert(member, group_id);
            }
        }

        let mut changed = HashSet::new();
        for &member in &members {
            if self.groups.get(&member).copied().flatten() != new_groups[&member] {
                changed.insert(member);
            }
        }

        self.groups = new_groups;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn uid(byte: u8) -> Uuid {
        Uuid::from_bytes([byte; 16])
    }

    #[test]
    fn solo_insert_has_no_group() {
        let mut index = ProximityIndex::new();
        let a = uid(1);
        let changed = index.insert(a, 0.0, 0.0);
        assert!(changed.is_empty());
        assert_eq!(index.group_of(a), None);
    }

    #[test]
    fn two_players_within_radius_share_lex_smallest_id() {
        let mut index = ProximityIndex::new();
        let a = uid(2);
        let b = uid(1); // lexicographically smaller than `a`
        index.insert(a, 100.0, 100.0);
        let changed = index.insert(b, 120.0, 100.0);

        assert!(changed.contains(&a));
        assert!(changed.contains(&b));
        assert_eq!(index.group_of(a), Some(b));
        assert_eq!(index.group_of(b), Some(b));
    }

    #[test]
    fn moving_out_of_radius_clears_both_groups() {
        let mut index = ProximityIndex::new();
        let a = uid(1);
        let b = uid(2);
        index.insert(a, 100.0, 100.0);
        index.insert(b, 120.0, 100.0);
        assert!(index.group_of(a).is_some());

        let changed = index.move_player(b, 400.0, 100.0);
        assert!(changed.contains(&a));
        assert!(changed.contains(&b));
        assert_eq!(index.group_of(a), None);
        assert_eq!(index.group_of(b), None);
    }

    #[test]
    fn removing_last_partner_clears_remaining_player_group() {
        let mut index = ProximityIndex::new();
        let a = uid(1);
        let b = uid(2);
        index.insert(a, 0.0, 0.0);
        index.insert(b, 10.0, 0.0);
        assert_eq!(index.group_of(a), Some(a));

        let changed = index.remove(b);
        assert!(changed.contains(&a));
        assert_eq!(index.group_of(a), None);
        assert_eq!(index.group_of(b), None);
    }

    #[test]
    fn transitive_chain_forms_one_component() {
        let mut index = ProximityIndex::new();
        let a = uid(3);
        let b = uid(2);
        let c = uid(1);
        index.insert(a, 0.0, 0.0);
        index.insert(b, 140.0, 0.0); // within radius of a
        index.insert(c, 280.0, 0.0); // within radius of b, not of a directly

        assert_eq!(index.group_of(a), Some(c));
        assert_eq!(index.group_of(b), Some(c));
        assert_eq!(index.group_of(c), Some(c));
    }

    #[test]
    fn boundary_distance_is_inclusive() {
        let mut index = ProximityIndex::new();
        let a = uid(1);
        let b = uid(2);
        index.insert(a, 0.0, 0.0);
        index.insert(b, PROXIMITY_RADIUS, 0.0);
        assert!(index.group_of(a).is_some());
    }

    proptest! {
        #[test]
        fn symmetric_proximity_law(
            ax in -500.0f64..500.0, ay in -500.0f64..500.0,
            bx in -500.0f64..500.0, by in -500.0f64..500.0,
        ) {
            let mut index = ProximityIndex::new();
            let a = uid(2);
            let b = uid(1);
            index.insert(a, ax, ay);
            index.insert(b, bx, by);

            let dx = ax - bx;
            let dy = ay - by;
            let within = (dx * dx + dy * dy).sqrt() <= PROXIMITY_RADIUS;

            if within {
                prop_assert_eq!(index.group_of(a), index.group_of(b));
                prop_assert!(index.group_of(a).is_some());
            } else {
                prop_assert_eq!(index.group_of(a), None);
                prop_assert_eq!(index.group_of(b), None);
            }
        }
    }
}

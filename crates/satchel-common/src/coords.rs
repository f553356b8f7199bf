//! Tile coordinates and compass directions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a map tile (x east, y south, z up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Tripoint {
    /// X coordinate (grows east)
    pub x: i32,
    /// Y coordinate (grows south)
    pub y: i32,
    /// Z level (grows up)
    pub z: i32,
}

impl Tripoint {
    /// Creates a new tile position.
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns this position shifted by the given offsets.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }
}

impl fmt::Display for Tripoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Roguelike distance: the largest per-axis difference.
#[must_use]
pub fn rl_dist(a: Tripoint, b: Tripoint) -> i32 {
    (a.x - b.x)
        .abs()
        .max((a.y - b.y).abs())
        .max((a.z - b.z).abs())
}

/// Compass direction from one tile to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Same tile
    Center,
    /// North (negative y)
    North,
    /// North-east
    NorthEast,
    /// East (positive x)
    East,
    /// South-east
    SouthEast,
    /// South (positive y)
    South,
    /// South-west
    SouthWest,
    /// West (negative x)
    West,
    /// North-west
    NorthWest,
    /// Directly above
    Above,
    /// Directly below
    Below,
}

impl Direction {
    /// Direction from `from` towards `to`, ignoring distance.
    #[must_use]
    pub fn between(from: Tripoint, to: Tripoint) -> Self {
        let dx = (to.x - from.x).signum();
        let dy = (to.y - from.y).signum();
        match (dx, dy) {
            (0, 0) => match (to.z - from.z).signum() {
                1 => Self::Above,
                -1 => Self::Below,
                _ => Self::Center,
            },
            (0, -1) => Self::North,
            (1, -1) => Self::NorthEast,
            (1, 0) => Self::East,
            (1, 1) => Self::SouthEast,
            (0, 1) => Self::South,
            (-1, 1) => Self::SouthWest,
            (-1, 0) => Self::West,
            _ => Self::NorthWest,
        }
    }

    /// Short compass name.
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            Self::Center => "",
            Self::North => "N",
            Self::NorthEast => "NE",
            Self::East => "E",
            Self::SouthEast => "SE",
            Self::South => "S",
            Self::SouthWest => "SW",
            Self::West => "W",
            Self::NorthWest => "NW",
            Self::Above => "UP",
            Self::Below => "DN",
        }
    }
}

/// Distance-and-direction suffix used to label things seen from `from`,
/// e.g. `"2NE"`.
#[must_use]
pub fn direction_suffix(from: Tripoint, to: Tripoint) -> String {
    let dist = rl_dist(from, to);
    if dist == 0 {
        return String::new();
    }
    format!("{dist}{}", Direction::between(from, to).short_name())
}

/// All tiles within `radius` of `center` on its z level, nearest ring first.
///
/// Within a ring tiles are listed clockwise starting north-west.
#[must_use]
pub fn closest_points_first(center: Tripoint, radius: i32) -> Vec<Tripoint> {
    if radius < 0 {
        return Vec::new();
    }
    let mut points = vec![center];
    for ring in 1..=radius {
        for x in -ring..ring {
            points.push(center.offset(x, -ring, 0));
        }
        for y in -ring..ring {
            points.push(center.offset(ring, y, 0));
        }
        for x in (-ring + 1..=ring).rev() {
            points.push(center.offset(x, ring, 0));
        }
        for y in (-ring + 1..=ring).rev() {
            points.push(center.offset(-ring, y, 0));
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rl_dist_is_chebyshev() {
        let a = Tripoint::new(0, 0, 0);
        assert_eq!(rl_dist(a, Tripoint::new(3, -1, 0)), 3);
        assert_eq!(rl_dist(a, Tripoint::new(0, 0, 2)), 2);
    }

    #[test]
    fn test_direction_between() {
        let o = Tripoint::new(5, 5, 0);
        assert_eq!(Direction::between(o, o.offset(0, -3, 0)), Direction::North);
        assert_eq!(Direction::between(o, o.offset(-1, 1, 0)), Direction::SouthWest);
        assert_eq!(Direction::between(o, o.offset(0, 0, 1)), Direction::Above);
        assert_eq!(Direction::between(o, o), Direction::Center);
    }

    #[test]
    fn test_direction_suffix_same_tile_is_empty() {
        let o = Tripoint::new(1, 1, 0);
        assert!(direction_suffix(o, o).is_empty());
        assert_eq!(direction_suffix(o, o.offset(-2, 0, 0)), "2W");
    }

    #[test]
    fn test_closest_points_first_ring_sizes() {
        let points = closest_points_first(Tripoint::default(), 2);
        assert_eq!(points.len(), 25);
        assert_eq!(points[0], Tripoint::default());
        assert!(points[1..9]
            .iter()
            .all(|p| rl_dist(*p, Tripoint::default()) == 1));
        assert!(closest_points_first(Tripoint::default(), -1).is_empty());
    }

    proptest! {
        #[test]
        fn prop_rings_are_unique_and_ordered(radius in 0i32..6, x in -50i32..50, y in -50i32..50) {
            let center = Tripoint::new(x, y, 0);
            let points = closest_points_first(center, radius);
            let side = (2 * radius + 1) as usize;
            prop_assert_eq!(points.len(), side * side);
            let mut sorted = points.clone();
            sorted.sort();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), points.len());
            prop_assert!(points.windows(2).all(|w| rl_dist(center, w[0]) <= rl_dist(center, w[1])));
        }

        #[test]
        fn prop_suffix_starts_with_distance(dx in -9i32..=9, dy in -9i32..=9) {
            let o = Tripoint::default();
            let to = o.offset(dx, dy, 0);
            let suffix = direction_suffix(o, to);
            if dx == 0 && dy == 0 {
                prop_assert!(suffix.is_empty());
            } else {
                prop_assert!(suffix.starts_with(&rl_dist(o, to).to_string()));
            }
        }
    }
}

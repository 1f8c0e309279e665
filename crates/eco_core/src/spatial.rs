//! Uniform spatial hash grid for radius-bounded neighbour queries.
//!
//! The grid is rebuilt from scratch every tick (motion invalidates it) and
//! dropped afterwards. Each entry is registered in every cell its build
//! radius could touch, so a query only has to visit the cells covering its
//! own bounding box.

use ahash::AHashMap;

use crate::math::Vec2;

/// Default cell side length in world units.
pub const DEFAULT_CELL_SIZE: f32 = 48.0;

/// An item stored in the grid with the position it was indexed at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialEntry<T> {
    /// Caller payload, usually an entity id.
    pub item: T,
    /// Indexed position.
    pub position: Vec2,
}

/// Sparse uniform grid.
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    cell_size: f32,
    entries: Vec<SpatialEntry<T>>,
    cells: AHashMap<(i32, i32), Vec<usize>>,
}

impl<T: Copy> SpatialGrid<T> {
    /// Build a grid, registering each entry in every cell within `radius`
    /// of its position.
    pub fn build(
        cell_size: f32,
        entries: impl IntoIterator<Item = (T, Vec2)>,
        radius: f32,
    ) -> Self {
        let cell_size = if cell_size > 0.0 {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        let mut grid = Self {
            cell_size,
            entries: Vec::new(),
            cells: AHashMap::new(),
        };
        let radius = radius.max(0.0);
        for (item, position) in entries {
            let index = grid.entries.len();
            grid.entries.push(SpatialEntry { item, position });
            let (min_x, min_y) = grid.cell_coord(position.x - radius, position.y - radius);
            let (max_x, max_y) = grid.cell_coord(position.x + radius, position.y + radius);
            for cx in min_x..=max_x {
                for cy in min_y..=max_y {
                    grid.cells.entry((cx, cy)).or_default().push(index);
                }
            }
        }
        grid
    }

    #[inline]
    fn cell_coord(&self, x: f32, y: f32) -> (i32, i32) {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the grid is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All indexed entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[SpatialEntry<T>] {
        &self.entries
    }

    /// Every entry registered in a cell overlapping the query's bounding box.
    ///
    /// This is a superset of the true matches and may repeat an entry that
    /// was registered in several of the visited cells. Callers filter by
    /// distance themselves.
    pub fn query(
        &self,
        center: Vec2,
        radius: f32,
    ) -> impl Iterator<Item = &SpatialEntry<T>> + '_ {
        let (min_x, min_y) = self.cell_coord(center.x - radius, center.y - radius);
        let (max_x, max_y) = self.cell_coord(center.x + radius, center.y + radius);
        (min_x..=max_x).flat_map(move |cx| {
            (min_y..=max_y).flat_map(move |cy| {
                self.cells
                    .get(&(cx, cy))
                    .into_iter()
                    .flatten()
                    .map(move |&index| &self.entries[index])
            })
        })
    }

    /// Entries within `radius` of `center`, each reported once, in insertion
    /// order.
    #[must_use]
    pub fn query_within(&self, center: Vec2, radius: f32) -> Vec<&SpatialEntry<T>> {
        let radius_sq = radius * radius;
        let mut indices: Vec<usize> = self
            .candidate_indices(center, radius)
            .filter(|&index| self.entries[index].position.distance_squared(center) <= radius_sq)
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices.into_iter().map(|index| &self.entries[index]).collect()
    }

    /// Closest entry strictly inside `radius` that satisfies `accept`.
    ///
    /// Ties resolve to the earliest inserted entry.
    pub fn nearest(
        &self,
        center: Vec2,
        radius: f32,
        mut accept: impl FnMut(&SpatialEntry<T>) -> bool,
    ) -> Option<&SpatialEntry<T>> {
        let radius_sq = radius * radius;
        let mut best: Option<(usize, f32)> = None;
        for index in self.candidate_indices(center, radius) {
            let entry = &self.entries[index];
            let dist_sq = entry.position.distance_squared(center);
            if dist_sq >= radius_sq || !accept(entry) {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_index, best_sq)) => {
                    dist_sq < best_sq || (dist_sq == best_sq && index < best_index)
                }
            };
            if better {
                best = Some((index, dist_sq));
            }
        }
        best.map(|(index, _)| &self.entries[index])
    }

    /// Entry indices in the 3x3 block of cells around `center`.
    ///
    /// Intended for grids built with a zero radius, where every entry lives
    /// in exactly one cell.
    pub fn neighborhood(&self, center: Vec2) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy) = self.cell_coord(center.x, center.y);
        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| {
                self.cells
                    .get(&(cx + dx, cy + dy))
                    .into_iter()
                    .flatten()
                    .copied()
            })
        })
    }

    fn candidate_indices(&self, center: Vec2, radius: f32) -> impl Iterator<Item = usize> + '_ {
        let (min_x, min_y) = self.cell_coord(center.x - radius, center.y - radius);
        let (max_x, max_y) = self.cell_coord(center.x + radius, center.y + radius);
        (min_x..=max_x).flat_map(move |cx| {
            (min_y..=max_y).flat_map(move |cy| self.cells.get(&(cx, cy)).into_iter().flatten().copied())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(points: &[(u32, Vec2)], center: Vec2, radius: f32) -> Vec<u32> {
        let mut ids: Vec<u32> = points
            .iter()
            .filter(|(_, p)| p.distance_squared(center) <= radius * radius)
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    #[test]
    fn test_query_is_superset_of_matches() {
        let points = vec![
            (1, Vec2::new(10.0, 10.0)),
            (2, Vec2::new(60.0, 10.0)),
            (3, Vec2::new(500.0, 500.0)),
        ];
        let grid = SpatialGrid::build(48.0, points.clone(), 20.0);
        let found: Vec<u32> = grid.query(Vec2::new(12.0, 12.0), 5.0).map(|e| e.item).collect();
        assert!(found.contains(&1));
        assert!(!found.contains(&3));
    }

    #[test]
    fn test_query_within_matches_brute_force() {
        let points: Vec<(u32, Vec2)> = (0..200)
            .map(|i| {
                let f = i as f32;
                (i, Vec2::new((f * 37.0) % 400.0, (f * 91.0) % 300.0))
            })
            .collect();
        let grid = SpatialGrid::build(48.0, points.clone(), 30.0);
        for center in [Vec2::new(0.0, 0.0), Vec2::new(200.0, 150.0), Vec2::new(399.0, 10.0)] {
            let mut found: Vec<u32> = grid
                .query_within(center, 30.0)
                .into_iter()
                .map(|e| e.item)
                .collect();
            found.sort_unstable();
            assert_eq!(found, brute_force(&points, center, 30.0));
        }
    }

    #[test]
    fn test_negative_coordinates() {
        let grid = SpatialGrid::build(48.0, vec![(7_u32, Vec2::new(-5.0, -5.0))], 0.0);
        let found = grid.query_within(Vec2::new(1.0, 1.0), 10.0);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].item, 7);
    }

    #[test]
    fn test_nearest_respects_filter() {
        let grid = SpatialGrid::build(
            48.0,
            vec![(1_u32, Vec2::new(5.0, 0.0)), (2, Vec2::new(10.0, 0.0))],
            40.0,
        );
        let nearest = grid.nearest(Vec2::ZERO, 40.0, |_| true).unwrap();
        assert_eq!(nearest.item, 1);
        let nearest = grid.nearest(Vec2::ZERO, 40.0, |e| e.item != 1).unwrap();
        assert_eq!(nearest.item, 2);
        assert!(grid.nearest(Vec2::ZERO, 4.0, |_| true).is_none());
    }

    #[test]
    fn test_neighborhood_covers_adjacent_cells() {
        let grid = SpatialGrid::build(
            48.0,
            vec![
                (1_u32, Vec2::new(47.0, 47.0)),
                (2, Vec2::new(50.0, 50.0)),
                (3, Vec2::new(200.0, 200.0)),
            ],
            0.0,
        );
        let mut near: Vec<usize> = grid.neighborhood(Vec2::new(47.0, 47.0)).collect();
        near.sort_unstable();
        assert_eq!(near, vec![0, 1]);
    }
}

//! Coarse bucketed spatial index for neighbor pre-filtering
//!
//! Positions are bucketed by `round(pos / cell_size)`. A query returns every
//! entity in every bucket overlapping the query square, so results can include
//! entities slightly outside the requested range but never miss one inside it.

use std::collections::HashMap;

use glam::{IVec2, Vec2};
use granule_core::config::WorldConfig;
use granule_ecs::{EntityId, Resource, UniverseView};

use crate::components::Position;

/// Buckets of entities keyed by coarse cell
#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    buckets: HashMap<IVec2, Vec<EntityId>>,
    len: usize,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        debug_assert!(cell_size > 0.0);
        Self {
            cell_size,
            buckets: HashMap::new(),
            len: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Bucket key for a point
    pub fn key(&self, pos: Vec2) -> IVec2 {
        (pos / self.cell_size).round().as_ivec2()
    }

    pub fn add(&mut self, entity: EntityId, pos: Vec2) {
        let key = self.key(pos);
        self.buckets.entry(key).or_default().push(entity);
        self.len += 1;
    }

    /// Every entity in the buckets overlapping the square of half-width
    /// `range` around `center`.
    pub fn query(&self, center: Vec2, range: f32) -> Vec<EntityId> {
        let mut found = Vec::new();
        self.query_into(center, range, &mut found);
        found
    }

    /// Like [`SpatialHash::query`], appending into a caller-owned buffer
    pub fn query_into(&self, center: Vec2, range: f32, found: &mut Vec<EntityId>) {
        let min = self.key(center - Vec2::splat(range));
        let max = self.key(center + Vec2::splat(range));
        for x in min.x..=max.x {
            for y in min.y..=max.y {
                if let Some(bucket) = self.buckets.get(&IVec2::new(x, y)) {
                    found.extend_from_slice(bucket);
                }
            }
        }
    }

    /// Entities near a single point
    pub fn point(&self, pos: Vec2) -> Vec<EntityId> {
        self.query(pos, 1.0)
    }

    /// Empty every bucket. Buckets used since the previous clear keep their
    /// allocation for the next rebuild; the rest are dropped.
    pub fn clear(&mut self) {
        self.buckets.retain(|_, bucket| {
            let used = !bucket.is_empty();
            bucket.clear();
            used
        });
        self.len = 0;
    }

    /// Number of entities indexed
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of buckets holding at least one entity
    pub fn bucket_count(&self) -> usize {
        self.buckets.values().filter(|b| !b.is_empty()).count()
    }
}

/// The spatial hash as a universe resource, rebuilt from every positioned
/// entity at the start of each tick
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    hash: SpatialHash,
    query_range: f32,
}

impl SpatialIndex {
    pub fn new(cell_size: f32, query_range: f32) -> Self {
        Self {
            hash: SpatialHash::new(cell_size),
            query_range,
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.hash_cell_size, config.query_range)
    }

    pub fn hash(&self) -> &SpatialHash {
        &self.hash
    }

    /// Query with the configured default range
    pub fn query(&self, center: Vec2) -> Vec<EntityId> {
        self.hash.query(center, self.query_range)
    }

    pub fn query_range(&self) -> f32 {
        self.query_range
    }
}

impl Resource for SpatialIndex {
    fn before_tick(&mut self, universe: &UniverseView<'_>) {
        self.hash.clear();
        let Some(flag) = universe.mask_of::<Position>() else {
            return;
        };
        for entity in universe.matching(flag) {
            if let Some(pos) = entity.get::<Position>() {
                self.hash.add(entity.id(), pos.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn id(raw: u64) -> EntityId {
        EntityId::from_raw(raw)
    }

    #[test]
    fn add_and_query_shared_bucket() {
        let mut hash = SpatialHash::new(4.0);
        hash.add(id(1), Vec2::new(10.0, 10.0));
        hash.add(id(2), Vec2::new(11.0, 11.0));
        hash.add(id(3), Vec2::new(100.0, 100.0));
        assert_eq!(hash.key(Vec2::new(10.0, 10.0)), hash.key(Vec2::new(11.0, 11.0)));
        assert_eq!(hash.bucket_count(), 2);

        let found = hash.query(Vec2::new(10.0, 10.0), 3.0);
        assert!(found.contains(&id(1)));
        assert!(found.contains(&id(2)));
        assert!(!found.contains(&id(3)));
    }

    #[test]
    fn empty_bucket_query_is_empty() {
        let hash = SpatialHash::new(4.0);
        assert!(hash.query(Vec2::new(5.0, 5.0), 3.0).is_empty());
        assert!(hash.point(Vec2::ZERO).is_empty());
    }

    #[test]
    fn clear_empties_everything() {
        let mut hash = SpatialHash::new(2.0);
        for i in 0..10 {
            hash.add(id(i), Vec2::new(i as f32, 0.0));
        }
        assert_eq!(hash.len(), 10);
        hash.clear();
        assert!(hash.is_empty());
        assert_eq!(hash.bucket_count(), 0);
        assert!(hash.query(Vec2::new(4.0, 0.0), 10.0).is_empty());
    }

    #[test]
    fn stale_buckets_are_dropped() {
        let mut hash = SpatialHash::new(4.0);
        for step in 0..50 {
            hash.clear();
            // A drifting entity touches a new bucket every rebuild.
            hash.add(id(1), Vec2::new(step as f32 * 40.0, 0.0));
            assert!(hash.buckets.len() <= 2, "{} buckets kept", hash.buckets.len());
        }
        assert_eq!(hash.bucket_count(), 1);
        hash.clear();
        hash.clear();
        assert!(hash.buckets.is_empty());
    }

    #[test]
    fn query_may_over_approximate() {
        let mut hash = SpatialHash::new(4.0);
        hash.add(id(1), Vec2::new(5.9, 0.0));
        // 5.9 is outside range 3 of the origin but shares a bucket edge with it.
        let found = hash.query(Vec2::ZERO, 3.0);
        assert_eq!(found, vec![id(1)]);
    }

    #[test]
    fn query_never_misses_entities_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for cell_size in [1.0f32, 2.5, 4.0, 7.0] {
            let mut hash = SpatialHash::new(cell_size);
            let points: Vec<Vec2> = (0..400)
                .map(|_| Vec2::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0)))
                .collect();
            for (i, p) in points.iter().enumerate() {
                hash.add(id(i as u64), *p);
            }

            for _ in 0..50 {
                let center = Vec2::new(rng.gen_range(-40.0..40.0), rng.gen_range(-40.0..40.0));
                let range = rng.gen_range(0.5..12.0);
                let found = hash.query(center, range);
                for (i, p) in points.iter().enumerate() {
                    let d = (*p - center).abs();
                    if d.x <= range && d.y <= range {
                        assert!(
                            found.contains(&id(i as u64)),
                            "cell {cell_size}: {p} within {range} of {center} missing"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn resource_rebuilds_from_positions() {
        use granule_ecs::{Entity, Universe};

        let mut universe = Universe::new();
        universe.register_component::<Position>().unwrap();
        universe.register_resource(SpatialIndex::new(4.0, 3.0)).unwrap();
        let near = universe.register_entity(Entity::new().with(Position::new(8.0, 8.0)));
        universe.register_entity(Entity::new().with(Position::new(80.0, 80.0)));
        universe.register_entity(Entity::new());

        universe.tick();
        let index = universe.resource::<SpatialIndex>().unwrap();
        assert_eq!(index.hash().len(), 2);
        assert_eq!(index.query(Vec2::new(8.0, 8.0)), vec![near]);

        universe.tick();
        assert_eq!(universe.resource::<SpatialIndex>().unwrap().hash().len(), 2);
    }
}

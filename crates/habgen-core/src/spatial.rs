//! Spatial index over placed module bounding boxes.
//!
//! A flat insertion-ordered registry. Queries scan linearly — layouts
//! hold tens of modules, not thousands — and return exactly what a
//! brute-force pass over the same boxes would return.

use crate::geometry::{PlacedBox, Vec3};

/// Registry of module ID → bounding box with range and radius queries.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    entries: Vec<(u32, PlacedBox)>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Insert or replace the box for a module ID.
    pub fn insert(&mut self, module_id: u32, bbox: PlacedBox) {
        if let Some(entry) = self.entries.iter_mut().find(|(id, _)| *id == module_id) {
            entry.1 = bbox;
        } else {
            self.entries.push((module_id, bbox));
        }
    }

    pub fn remove(&mut self, module_id: u32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != module_id);
        self.entries.len() != before
    }

    pub fn get(&self, module_id: u32) -> Option<&PlacedBox> {
        self.entries
            .iter()
            .find(|(id, _)| *id == module_id)
            .map(|(_, b)| b)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// IDs and boxes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(u32, PlacedBox)> {
        self.entries.iter()
    }

    /// Module IDs whose box surface lies within `radius` of `point`,
    /// in insertion order.
    pub fn query_nearby(&self, point: &Vec3, radius: f32) -> Vec<u32> {
        self.entries
            .iter()
            .filter(|(_, b)| b.distance_to_point(point) <= radius)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Module IDs whose box intersects the axis-aligned range
    /// [min, max], in insertion order.
    pub fn query_range(&self, min: &Vec3, max: &Vec3) -> Vec<u32> {
        let center = Vec3::new(
            (min.x + max.x) / 2.0,
            (min.y + max.y) / 2.0,
            (min.z + max.z) / 2.0,
        );
        let half = Vec3::new(
            (max.x - min.x) / 2.0,
            (max.y - min.y) / 2.0,
            (max.z - min.z) / 2.0,
        );
        let range = PlacedBox { center, half };
        self.entries
            .iter()
            .filter(|(_, b)| {
                // Touching the range boundary counts as inside.
                (b.center.x - range.center.x).abs() <= b.half.x + range.half.x
                    && (b.center.y - range.center.y).abs() <= b.half.y + range.half.y
                    && (b.center.z - range.center.z).abs() <= b.half.z + range.half.z
            })
            .map(|(id, _)| *id)
            .collect()
    }
}

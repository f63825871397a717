// Click-to-measure polyline.
//
// Points are framebuffer pixels recorded in overview, kept in click order.
// The running total is bumped by one segment on append and recomputed from
// scratch on removal, so it never drifts from the point list after deletes.

use glam::Vec2;

#[derive(Debug, Clone, Default)]
pub struct MeasurementLedger {
    points: Vec<Vec2>,
    distance_px: f32,
}

impl MeasurementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum of consecutive segment lengths, in framebuffer pixels.
    pub fn distance_px(&self) -> f32 {
        self.distance_px
    }

    /// Most recently added point; drawn highlighted.
    pub fn last_index(&self) -> Option<usize> {
        self.points.len().checked_sub(1)
    }

    /// Append a point and add the new segment to the total. Returns its index.
    pub fn add_point(&mut self, point: Vec2) -> usize {
        if let Some(prev) = self.points.last() {
            self.distance_px += prev.distance(point);
        }
        self.points.push(point);
        self.points.len() - 1
    }

    /// Remove the point at `index` and recompute the total.
    /// Returns the removed point, or None for an out-of-range index.
    pub fn remove_point(&mut self, index: usize) -> Option<Vec2> {
        if index >= self.points.len() {
            return None;
        }
        let removed = self.points.remove(index);
        self.distance_px = polyline_length(&self.points);
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.distance_px = 0.0;
    }

    /// Distance re-expressed in the pixel basis used while walking.
    ///
    /// Overview measures at full zoom-out, walking accumulates at the zoom
    /// that was active before entering overview. A non-positive saved scale
    /// is treated as 1.0.
    pub fn walking_equivalent_px(&self, walking_scale: f32) -> f32 {
        let scale = if walking_scale > 0.0 { walking_scale } else { 1.0 };
        self.distance_px / scale
    }

    pub fn meters(&self, walking_scale: f32, meters_per_pixel: f32) -> f32 {
        self.walking_equivalent_px(walking_scale) * meters_per_pixel
    }
}

/// Sum of Euclidean distances between consecutive points.
pub fn polyline_length(points: &[Vec2]) -> f32 {
    points.windows(2).map(|pair| pair[0].distance(pair[1])).sum()
}

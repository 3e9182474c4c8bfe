//! Shape consolidation
//!
//! Feeds often describe the same physical track under several shape ids
//! (shared trunks of different routes, inbound/outbound pairs). Rendering
//! every shape as-is stacks identical geometry. Consolidation walks every
//! shape's consecutive point pairs and keeps each physical segment once,
//! regardless of direction, splitting lines where an already-drawn segment
//! was skipped.

use std::collections::HashSet;

use crate::Row;

/// A vertex as `[lat, lon]`
pub type LatLon = [f64; 2];

/// One raw row of `shapes`
#[derive(Debug, Clone, PartialEq)]
pub struct ShapePoint {
    pub shape_id: String,
    pub lat: f64,
    pub lon: f64,
    pub sequence: i64,
}

impl ShapePoint {
    /// Read a point from a `shapes` row; rows missing any field are skipped
    pub fn from_row(row: &Row) -> Option<Self> {
        Some(Self {
            shape_id: row.get_str("shape_id")?.to_string(),
            lat: row.get_f64("shape_pt_lat")?,
            lon: row.get_f64("shape_pt_lon")?,
            sequence: row.get_i64("shape_pt_sequence")?,
        })
    }

    fn lat_lon(&self) -> LatLon {
        [self.lat, self.lon]
    }
}

/// Group points by shape id (first-seen order) and sort each group by sequence
pub fn group_shapes(points: Vec<ShapePoint>) -> Vec<Vec<LatLon>> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: std::collections::HashMap<String, Vec<ShapePoint>> = std::collections::HashMap::new();

    for point in points {
        if !groups.contains_key(&point.shape_id) {
            order.push(point.shape_id.clone());
        }
        groups.entry(point.shape_id.clone()).or_default().push(point);
    }

    order
        .into_iter()
        .filter_map(|shape_id| groups.remove(&shape_id))
        .map(|mut group| {
            group.sort_by_key(|p| p.sequence);
            group.iter().map(ShapePoint::lat_lon).collect()
        })
        .collect()
}

/// Direction-independent identity of a segment
type SegmentKey = ((u64, u64), (u64, u64));

fn segment_key(a: LatLon, b: LatLon) -> SegmentKey {
    let a = (a[0].to_bits(), a[1].to_bits());
    let b = (b[0].to_bits(), b[1].to_bits());
    if a <= b { (a, b) } else { (b, a) }
}

/// Merge ordered point sequences into lines that never repeat a segment.
///
/// The first shape to draw a segment keeps it. Each output line has at least
/// two vertices, and its vertex count is its segment count plus one.
pub fn consolidate_lines(shapes: &[Vec<LatLon>]) -> Vec<Vec<LatLon>> {
    let mut seen: HashSet<SegmentKey> = HashSet::new();
    let mut lines: Vec<Vec<LatLon>> = Vec::new();

    for shape in shapes {
        lines.push(Vec::new());

        for pair in shape.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let key = segment_key(a, b);

            if seen.contains(&key) {
                lines.push(Vec::new());
                continue;
            }

            if let Some(current) = lines.last_mut() {
                if current.is_empty() {
                    current.push(a);
                }
                current.push(b);
            }
            seen.insert(key);
        }
    }

    lines.retain(|line| line.len() > 1);
    lines
}

/// Group, sort and consolidate raw shape points in one step
pub fn consolidate(points: Vec<ShapePoint>) -> Vec<Vec<LatLon>> {
    consolidate_lines(&group_shapes(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(shape_id: &str, lat: f64, lon: f64, sequence: i64) -> ShapePoint {
        ShapePoint { shape_id: shape_id.to_string(), lat, lon, sequence }
    }

    #[test]
    fn test_groups_sorted_by_sequence() {
        let groups = group_shapes(vec![
            point("b", 5.0, 5.0, 1),
            point("a", 0.0, 2.0, 3),
            point("a", 0.0, 0.0, 1),
            point("a", 0.0, 1.0, 2),
        ]);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec![[5.0, 5.0]]);
        assert_eq!(groups[1], vec![[0.0, 0.0], [0.0, 1.0], [0.0, 2.0]]);
    }

    #[test]
    fn test_single_shape_is_one_line() {
        let lines = consolidate(vec![point("a", 0.0, 0.0, 1), point("a", 0.0, 1.0, 2), point("a", 1.0, 1.0, 3)]);
        assert_eq!(lines, vec![vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0]]]);
    }

    #[test]
    fn test_shared_reversed_segment_kept_once() {
        let a = [0.0, 0.0];
        let b = [0.0, 1.0];
        let c = [0.0, 2.0];
        let d = [1.0, 1.0];
        // First shape: a-b, b-c. Second: c-b (shared, reversed), b-d.
        let lines = consolidate_lines(&[vec![a, b, c], vec![c, b, d]]);

        assert_eq!(lines, vec![vec![a, b, c], vec![b, d]]);

        let unique_segments = 3;
        let vertices: usize = lines.iter().map(Vec::len).sum();
        assert_eq!(vertices, unique_segments + lines.len());
    }

    #[test]
    fn test_fully_duplicated_shape_disappears() {
        let a = [10.0, 10.0];
        let b = [10.5, 10.5];
        let lines = consolidate_lines(&[vec![a, b], vec![a, b], vec![b, a]]);
        assert_eq!(lines, vec![vec![a, b]]);
    }

    #[test]
    fn test_shared_middle_splits_line() {
        let p = |x: f64| [0.0, x];
        // Second shape shares only its middle segment with the first
        let lines = consolidate_lines(&[vec![p(1.0), p(2.0)], vec![p(0.0), p(1.0), p(2.0), p(3.0)]]);
        assert_eq!(lines, vec![vec![p(1.0), p(2.0)], vec![p(0.0), p(1.0)], vec![p(2.0), p(3.0)]]);
    }

    #[test]
    fn test_single_point_shapes_dropped() {
        assert!(consolidate(vec![point("lonely", 1.0, 1.0, 0)]).is_empty());
        assert!(consolidate(Vec::new()).is_empty());
    }
}

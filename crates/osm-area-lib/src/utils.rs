//! Numeric helpers shared by the assembler and the classifier

use crate::Coordinate;
use geo::{Coord, Rect};

/// Twice the signed area of a closed coordinate sequence (shoelace formula)
///
/// Computed exactly in fixed-precision units. Positive means counter-clockwise.
#[inline]
pub fn twice_signed_area(coords: &[Coordinate]) -> i128 {
    coords
        .windows(2)
        .map(|pair| {
            let (a, b) = (pair[0], pair[1]);
            i128::from(a.x()) * i128::from(b.y()) - i128::from(b.x()) * i128::from(a.y())
        })
        .sum()
}

/// Number of distinct coordinates in a sequence
pub fn distinct_count(coords: &[Coordinate]) -> usize {
    let mut sorted = coords.to_vec();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.len()
}

/// Bounding box of a coordinate sequence in fixed-precision units
///
/// Returns `None` for an empty sequence.
pub fn raw_bounding_box(coords: &[Coordinate]) -> Option<Rect<f64>> {
    let first = coords.first()?;
    let (mut min_x, mut min_y) = (first.x(), first.y());
    let (mut max_x, mut max_y) = (min_x, min_y);
    for c in &coords[1..] {
        min_x = min_x.min(c.x());
        min_y = min_y.min(c.y());
        max_x = max_x.max(c.x());
        max_y = max_y.max(c.y());
    }
    Some(Rect::new(
        Coord {
            x: f64::from(min_x),
            y: f64::from(min_y),
        },
        Coord {
            x: f64::from(max_x),
            y: f64::from(max_y),
        },
    ))
}

/// Whether a point lies in a rectangle, edges included
#[inline(always)]
pub fn rect_contains(rect: &Rect<f64>, point: Coord<f64>) -> bool {
    point.x >= rect.min().x
        && point.x <= rect.max().x
        && point.y >= rect.min().y
        && point.y <= rect.max().y
}

/// Midpoint of two coordinates, in fixed-precision units
#[inline(always)]
pub fn raw_midpoint(a: Coordinate, b: Coordinate) -> Coord<f64> {
    Coord {
        x: (f64::from(a.x()) + f64::from(b.x())) / 2.0,
        y: (f64::from(a.y()) + f64::from(b.y())) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Coordinate> {
        [(0, 0), (10, 0), (10, 10), (0, 10), (0, 0)]
            .into_iter()
            .map(|(x, y)| Coordinate::from_raw(x, y))
            .collect()
    }

    #[test]
    fn test_twice_signed_area_orientation() {
        let mut coords = square();
        assert_eq!(twice_signed_area(&coords), 200);
        coords.reverse();
        assert_eq!(twice_signed_area(&coords), -200);
    }

    #[test]
    fn test_twice_signed_area_does_not_overflow() {
        let max = crate::coordinate::MAX_X;
        let lat = crate::coordinate::MAX_Y;
        let coords: Vec<_> = [(-max, -lat), (max, -lat), (max, lat), (-max, lat), (-max, -lat)]
            .into_iter()
            .map(|(x, y)| Coordinate::from_raw(x, y))
            .collect();
        let expected = 2 * (2 * i128::from(max)) * (2 * i128::from(lat));
        assert_eq!(twice_signed_area(&coords), expected);
    }

    #[test]
    fn test_distinct_count() {
        assert_eq!(distinct_count(&square()), 4);
        assert_eq!(distinct_count(&[]), 0);
    }

    #[test]
    fn test_bounding_box() {
        let bbox = raw_bounding_box(&square()).unwrap();
        assert_eq!(bbox.min(), Coord { x: 0.0, y: 0.0 });
        assert_eq!(bbox.max(), Coord { x: 10.0, y: 10.0 });
        assert!(rect_contains(&bbox, Coord { x: 10.0, y: 5.0 }));
        assert!(!rect_contains(&bbox, Coord { x: 10.5, y: 5.0 }));
        assert!(raw_bounding_box(&[]).is_none());
    }

    #[test]
    fn test_raw_midpoint() {
        let mid = raw_midpoint(Coordinate::from_raw(0, 0), Coordinate::from_raw(3, 4));
        assert_eq!(mid, Coord { x: 1.5, y: 2.0 });
    }
}

use crate::elements::Node;
use geo::Coord;

use std::f64::consts::PI;

pub const EARTH_WIDTH: f64 = 20037508.342789244;

pub fn latitude_mercator(y: f64, scale: f64) -> f64 {
    (PI * (1.0 + y / 90.0) / 4.0).tan().ln() * scale / PI
}

pub fn forward(c: &Coord<f64>) -> Coord<f64> {
    Coord {
        x: c.x * EARTH_WIDTH / 180.0,
        y: latitude_mercator(c.y, EARTH_WIDTH),
    }
}

/// Projects longitude/latitude degrees in place. 4326 is a pass
/// through, everything else is treated as web mercator.
pub fn coords_to_srid(srid: u32, coords: &mut [Coord<f64>]) {
    if srid == 4326 {
        return;
    }
    for c in coords.iter_mut() {
        *c = forward(c);
    }
}

pub fn node_to_srid(srid: u32, node: &mut Node) {
    if srid == 4326 {
        return;
    }
    let p = forward(&Coord {
        x: node.lon,
        y: node.lat,
    });
    node.lon = p.x;
    node.lat = p.y;
}

pub fn pythag(p: &Coord<f64>, q: &Coord<f64>) -> f64 {
    f64::sqrt(f64::powi(p.x - q.x, 2) + f64::powi(p.y - q.y, 2))
}

pub fn calc_ring_area(coords: &[Coord<f64>]) -> f64 {
    if coords.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;

    let mut prev = &coords[0];
    for i in 1..coords.len() {
        let curr = &coords[i];
        area += prev.x * curr.y - prev.y * curr.x;
        prev = curr;
    }

    return area / 2.0; //anti-clockwise rings are positive
}

fn segment_side(p1: &Coord<f64>, p2: &Coord<f64>, q: &Coord<f64>) -> i32 {
    let s = (q.x - p1.x) * (p2.y - p1.y) - (p2.x - p1.x) * (q.y - p1.y);

    if s < 0.0 {
        -1
    } else if s > 0.0 {
        1
    } else {
        0
    }
}

pub fn segment_intersects(
    p1: &Coord<f64>,
    p2: &Coord<f64>,
    q1: &Coord<f64>,
    q2: &Coord<f64>,
) -> bool {
    let pq1 = segment_side(p1, p2, q1);
    let pq2 = segment_side(p1, p2, q2);
    if pq1 == pq2 {
        return false;
    }

    let qp1 = segment_side(q1, q2, p1);
    let qp2 = segment_side(q1, q2, p2);
    if qp1 == qp2 {
        return false;
    }
    return true;
}

pub fn line_intersects(left: &[Coord<f64>], right: &[Coord<f64>]) -> bool {
    if left.len() < 2 || right.len() < 2 {
        return false;
    }

    for i in 0..(left.len() - 1) {
        for j in 0..(right.len() - 1) {
            if segment_intersects(&left[i], &left[i + 1], &right[j], &right[j + 1]) {
                return true;
            }
        }
    }
    false
}

/// Crossing-count containment test, after Franklin's pnpoly.
pub fn point_in_poly(line: &[Coord<f64>], pt: &Coord<f64>) -> bool {
    let mut c = false;
    for i in 0..line.len() {
        let j = if i == 0 { line.len() - 1 } else { i - 1 };

        if (line[i].y > pt.y) != (line[j].y > pt.y) {
            if pt.x < (line[j].x - line[i].x) * (pt.y - line[i].y) / (line[j].y - line[i].y) + line[i].x {
                c = !c;
            }
        }
    }
    c
}

pub fn polygon_contains(bigger: &[Coord<f64>], smaller: &[Coord<f64>]) -> bool {
    if smaller.is_empty() {
        return false;
    }
    if line_intersects(bigger, smaller) {
        return false;
    }

    point_in_poly(bigger, &smaller[0])
}

/// True if any two non-adjacent segments of a closed ring cross.
pub fn ring_self_intersects(coords: &[Coord<f64>]) -> bool {
    if coords.len() < 4 {
        return false;
    }
    let nseg = coords.len() - 1;
    for i in 0..nseg {
        for j in (i + 2)..nseg {
            if i == 0 && j == nseg - 1 {
                continue; //first and last segments share the closing node
            }
            if segment_intersects(&coords[i], &coords[i + 1], &coords[j], &coords[j + 1]) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, side: f64) -> Vec<Coord<f64>> {
        vec![
            Coord { x: x0, y: y0 },
            Coord { x: x0 + side, y: y0 },
            Coord { x: x0 + side, y: y0 + side },
            Coord { x: x0, y: y0 + side },
            Coord { x: x0, y: y0 },
        ]
    }

    #[test]
    fn test_calc_ring_area() {
        let sq = square(0.0, 0.0, 10.0);
        assert_eq!(calc_ring_area(&sq), 100.0);

        let mut rev = sq.clone();
        rev.reverse();
        assert_eq!(calc_ring_area(&rev), -100.0);
    }

    #[test]
    fn test_point_in_poly() {
        let sq = square(0.0, 0.0, 10.0);
        assert!(point_in_poly(&sq, &Coord { x: 5.0, y: 5.0 }));
        assert!(!point_in_poly(&sq, &Coord { x: 15.0, y: 5.0 }));
        assert!(!point_in_poly(&sq, &Coord { x: -1.0, y: -1.0 }));
    }

    #[test]
    fn test_polygon_contains() {
        let outer = square(0.0, 0.0, 10.0);
        let inner = square(2.0, 2.0, 3.0);
        let beside = square(20.0, 20.0, 3.0);

        assert!(polygon_contains(&outer, &inner));
        assert!(!polygon_contains(&inner, &outer));
        assert!(!polygon_contains(&outer, &beside));
    }

    #[test]
    fn test_ring_self_intersects() {
        assert!(!ring_self_intersects(&square(0.0, 0.0, 10.0)));

        //bow tie
        let bow = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 10.0 },
            Coord { x: 10.0, y: 0.0 },
            Coord { x: 0.0, y: 10.0 },
            Coord { x: 0.0, y: 0.0 },
        ];
        assert!(ring_self_intersects(&bow));
    }

    #[test]
    fn test_forward() {
        let p = forward(&Coord { x: 180.0, y: 0.0 });
        assert!((p.x - EARTH_WIDTH).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
    }
}

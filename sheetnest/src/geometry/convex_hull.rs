use crate::geometry::primitives::Point;

/// Returns the points forming the convex hull of the input, in counterclockwise order.
/// Collinear points are dropped. Fewer than three distinct points are returned as they are.
/// Monotone chain: <https://en.wikibooks.org/wiki/Algorithm_Implementation/Geometry/Convex_hull/Monotone_chain>
pub fn convex_hull_from_points(mut points: Vec<Point>) -> Vec<Point> {
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    points.dedup();
    if points.len() < 3 {
        return points;
    }

    let mut lower_hull = points.iter().fold(vec![], grow_convex_hull);
    let mut upper_hull = points.iter().rev().fold(vec![], grow_convex_hull);

    //first and last element of both hull parts are the same point
    upper_hull.pop();
    lower_hull.pop();

    lower_hull.append(&mut upper_hull);
    lower_hull
}

fn grow_convex_hull(mut h: Vec<Point>, np: &Point) -> Vec<Point> {
    //pop all points from the hull which are made irrelevant by the new point
    while h.len() >= 2 && cross(&h[h.len() - 2], &h[h.len() - 1], np) <= 0.0 {
        h.pop();
    }
    h.push(*np);
    h
}

fn cross(a: &Point, b: &Point, c: &Point) -> f64 {
    (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0)
}

//! Splits simple polygons into convex parts.
//!
//! Every reflex vertex is resolved by cutting the polygon along a segment that starts at that vertex and
//! ends either at another mutually visible vertex or at a point synthesized on the nearest edge hit by the
//! bisector of the reflex angle. Pending sub-polygons are kept on an explicit work-stack, so the depth of the
//! native stack does not depend on the input.

use anyhow::{Result, bail, ensure};
use itertools::Itertools;
use log::trace;
use ordered_float::OrderedFloat;

use crate::geometry::geo_enums::Winding;
use crate::geometry::primitives::{Edge, Point, SPolygon};

/// Relative tolerance used for turn and cone tests
const TURN_EPS: f64 = 1e-9;

/// Decomposes a simple polygon into convex parts whose union is the input polygon.
/// The parts are returned in counterclockwise order. A convex input is returned as a single part.
pub fn decompose(points: &[Point]) -> Result<Vec<Vec<Point>>> {
    let mut polygon = points.iter().copied().dedup().collect_vec();
    if polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }
    ensure!(
        polygon.len() >= 3,
        "cannot decompose a polygon with fewer than 3 distinct points"
    );

    match Winding::from_signed_area(SPolygon::calculate_area(&polygon)) {
        Winding::Collinear => bail!("cannot decompose a polygon without area"),
        Winding::Clockwise => polygon.reverse(),
        Winding::CounterClockwise => {}
    }

    let n_original = polygon.len();
    let mut budget = 4 * n_original * n_original + 16;

    let mut stack = vec![polygon];
    let mut parts = vec![];

    while let Some(poly) = stack.pop() {
        ensure!(
            budget > 0,
            "concave decomposition did not terminate for a polygon with {n_original} vertices"
        );
        budget -= 1;

        match first_reflex_vertex(&poly) {
            None => parts.push(poly),
            Some(i) => {
                let (left, right) = split_at_reflex(poly, i)?;
                for sub in [left, right] {
                    if SPolygon::calculate_area(&sub) > f64::EPSILON {
                        stack.push(sub);
                    }
                }
            }
        }
    }

    trace!(
        "decomposed polygon with {} vertices into {} convex parts",
        n_original,
        parts.len()
    );

    Ok(parts)
}

/// Z-component of the turn made at `cur`, negative for a clockwise (reflex) turn
fn turn(prev: Point, cur: Point, next: Point) -> f64 {
    (cur - prev).cross(&(next - cur))
}

fn is_reflex(poly: &[Point], i: usize) -> bool {
    let n = poly.len();
    let (prev, cur, next) = (poly[(i + n - 1) % n], poly[i], poly[(i + 1) % n]);
    let scale = (cur - prev).norm() * (next - cur).norm();
    turn(prev, cur, next) < -TURN_EPS * scale
}

fn first_reflex_vertex(poly: &[Point]) -> Option<usize> {
    (0..poly.len()).find(|&i| is_reflex(poly, i))
}

/// Splits `poly` along a cut starting in reflex vertex `i`.
fn split_at_reflex(mut poly: Vec<Point>, i: usize) -> Result<(Vec<Point>, Vec<Point>)> {
    let n = poly.len();
    let (i_prev, i_next) = ((i + n - 1) % n, (i + 1) % n);
    let v = poly[i];
    //direction of the incoming edge and of the outgoing edge
    let a = v - poly[i_prev];
    let b = poly[i_next] - v;

    //the cut must leave v inside the cone spanned by the extensions of both incident edges,
    //so both resulting angles at v are at most 180°
    let in_cone = |d: Point| {
        let tol = TURN_EPS * d.norm() * a.norm().max(b.norm());
        b.cross(&d) >= -tol && a.cross(&d) >= -tol && d.norm() > TURN_EPS
    };

    let best_vertex = (0..n)
        .filter(|&j| j != i && j != i_prev && j != i_next)
        .filter(|&j| in_cone(poly[j] - v))
        .filter(|&j| is_visible(&poly, i, j))
        .min_by_key(|&j| (!is_reflex(&poly, j), OrderedFloat(v.sq_distance_to(&poly[j]))));

    let (i, target) = match best_vertex {
        Some(j) => (i, j),
        None => {
            //no visible vertex, cut towards the nearest edge along the bisector of the cone
            let bisector = match (a.normalized(), (-b).normalized()) {
                (Some(na), Some(nb)) => (na + nb).normalized().unwrap_or(na.perp_cw().scale(-1.0)),
                _ => bail!("degenerate edges around reflex vertex {v:?}"),
            };
            let hit = (0..n)
                .filter(|&k| k != i && (k + 1) % n != i)
                .filter_map(|k| {
                    let edge = Edge {
                        start: poly[k],
                        end: poly[(k + 1) % n],
                    };
                    edge.ray_intersection(v, bisector).map(|t| (k, t))
                })
                .min_by_key(|(_, t)| OrderedFloat(*t));

            let Some((k, t)) = hit else {
                bail!("no valid split found for reflex vertex {v:?}, malformed polygon")
            };
            let p = v + bisector.scale(t);
            let k_next = (k + 1) % n;
            let snap = TURN_EPS * 1e3 * (1.0 + t);

            if p.distance_to(&poly[k]) < snap && k != i_prev && k != i_next {
                (i, k)
            } else if p.distance_to(&poly[k_next]) < snap && k_next != i_prev && k_next != i_next {
                (i, k_next)
            } else {
                //synthesize a new vertex on edge k
                poly.insert(k + 1, p);
                let i = if k < i { i + 1 } else { i };
                (i, k + 1)
            }
        }
    };

    let n = poly.len();
    ensure!(
        target != i && target != (i + 1) % n && target != (i + n - 1) % n,
        "split target adjacent to reflex vertex {v:?}"
    );

    Ok((cyclic_slice(&poly, i, target), cyclic_slice(&poly, target, i)))
}

/// True if the segment between vertex `i` and vertex `j` does not touch any edge other than those incident to `i` or `j`
fn is_visible(poly: &[Point], i: usize, j: usize) -> bool {
    let n = poly.len();
    let cut = Edge {
        start: poly[i],
        end: poly[j],
    };
    (0..n)
        .filter(|&k| {
            let k_next = (k + 1) % n;
            k != i && k_next != i && k != j && k_next != j
        })
        .all(|k| {
            let edge = Edge {
                start: poly[k],
                end: poly[(k + 1) % n],
            };
            cut.collides_at(&edge).is_none()
        })
}

/// Vertices from `from` up to and including `to`, wrapping around
fn cyclic_slice(poly: &[Point], from: usize, to: usize) -> Vec<Point> {
    let n = poly.len();
    let len = (to + n - from) % n + 1;
    (0..len).map(|k| poly[(from + k) % n]).collect_vec()
}

use anyhow::{Context, Result, bail, ensure};
use itertools::Itertools;
use log::warn;

use crate::entities::{Instance, PairPiece, Piece, SameTypePiece, Sheet};
use crate::geometry::primitives::{Edge, Point, Rect, SPolygon};
use crate::io::ext_repr::{
    ExtInstance, ExtLine, ExtPairPiece, ExtPiece, ExtSPolygon, ExtSameTypePiece, ExtShape, ExtSheet,
};
use crate::util::FPA;

/// Converts external representations of pieces and sheets into internal ones, validating them along the way.
/// Malformed input is rejected here, before any nesting starts.
#[derive(Clone, Debug, Copy, Default)]
pub struct Importer;

impl Importer {
    pub fn import_instance(&self, ext_instance: &ExtInstance) -> Result<Instance> {
        let pieces = ext_instance
            .pieces
            .iter()
            .sorted_by_key(|p| p.id)
            .map(|p| self.import_piece(p))
            .collect::<Result<Vec<Piece>>>()?;

        let sheets = ext_instance
            .sheets
            .iter()
            .sorted_by_key(|s| s.id)
            .map(|s| self.import_sheet(s))
            .collect::<Result<Vec<Sheet>>>()?;

        let same_type_pieces = ext_instance
            .same_type_pieces
            .iter()
            .map(import_same_type_piece)
            .collect_vec();

        let pair_pieces = ext_instance
            .pair_pieces
            .iter()
            .map(import_pair_piece)
            .collect_vec();

        Instance::new(pieces, sheets, same_type_pieces, pair_pieces)
            .with_context(|| format!("invalid instance: {}", ext_instance.name))
    }

    pub fn import_piece(&self, ext_piece: &ExtPiece) -> Result<Piece> {
        let shape = import_shape(&ext_piece.shape)
            .with_context(|| format!("invalid shape for piece {}", ext_piece.id))?;
        let reference_lines = ext_piece
            .reference_lines
            .iter()
            .map(import_line)
            .collect::<Result<Vec<Edge>>>()
            .with_context(|| format!("invalid reference line for piece {}", ext_piece.id))?;

        Piece::new(
            ext_piece.id as usize,
            shape,
            ext_piece.quantity,
            reference_lines,
        )
    }

    pub fn import_sheet(&self, ext_sheet: &ExtSheet) -> Result<Sheet> {
        Sheet::new(
            ext_sheet.id as usize,
            ext_sheet.kind,
            ext_sheet.width,
            ext_sheet.height,
            ext_sheet.margins.unwrap_or_default(),
        )
    }
}

pub fn import_shape(ext_shape: &ExtShape) -> Result<SPolygon> {
    match ext_shape {
        ExtShape::Rectangle {
            x_min,
            y_min,
            width,
            height,
        } => {
            ensure!(
                [x_min, y_min, width, height].iter().all(|v| v.is_finite()),
                "rectangle contains non-finite values"
            );
            let rect = Rect::try_new(*x_min, *y_min, x_min + width, y_min + height)?;
            SPolygon::new(rect.corners().to_vec())
        }
        ExtShape::SimplePolygon(esp) => import_simple_polygon(esp),
    }
}

pub fn import_simple_polygon(sp: &ExtSPolygon) -> Result<SPolygon> {
    let mut points = sp.0.iter().map(|(x, y)| Point(*x, *y)).collect_vec();
    ensure!(
        points.iter().all(|p| p.is_finite()),
        "simple polygon contains non-finite coordinates"
    );
    //Strip the last vertex if it is the same as the first one
    if points.len() > 1 && points[0] == points[points.len() - 1] {
        points.pop();
    }
    //Remove duplicates that are consecutive (e.g. [1, 2, 2, 3] -> [1, 2, 3])
    eliminate_degenerate_points(&mut points);
    //Bail if there are any non-consecutive duplicates.
    if points.len() != points.iter().unique().count() {
        bail!("simple polygon has non-consecutive duplicate vertices");
    }
    ensure_no_self_intersection(&points)?;
    SPolygon::new(points)
}

/// Bails if two non-adjacent edges of the closed contour meet
fn ensure_no_self_intersection(points: &[Point]) -> Result<()> {
    let n = points.len();
    let edges = (0..n)
        .map(|i| Edge {
            start: points[i],
            end: points[(i + 1) % n],
        })
        .collect_vec();
    for (i, j) in (0..n).tuple_combinations() {
        if j == i + 1 || (i == 0 && j == n - 1) {
            continue;
        }
        if let Some(p) = edges[i].collides_at(&edges[j]) {
            bail!("simple polygon intersects itself at {p:?} (edges {i} and {j})");
        }
    }
    Ok(())
}

fn import_line(ext_line: &ExtLine) -> Result<Edge> {
    let (start, end) = (Point::from(ext_line.start), Point::from(ext_line.end));
    ensure!(
        start.is_finite() && end.is_finite(),
        "reference line contains non-finite coordinates"
    );
    Edge::try_new(start, end)
}

fn import_same_type_piece(ext: &ExtSameTypePiece) -> SameTypePiece {
    SameTypePiece {
        id: ext.id as usize,
        piece_ids: ext.piece_ids.iter().map(|id| *id as usize).collect(),
    }
}

fn import_pair_piece(ext: &ExtPairPiece) -> PairPiece {
    PairPiece {
        id: ext.id as usize,
        left: ext.left as usize,
        right: ext.right as usize,
        size: ext.size,
    }
}

pub fn eliminate_degenerate_points(points: &mut Vec<Point>) {
    let n_points = points.len();
    let mut indices_to_remove = (0..n_points)
        .filter(|&i| {
            let (p_i, p_j) = (points[i], points[(i + 1) % n_points]);
            n_points > 1 && FPA(p_i.0) == FPA(p_j.0) && FPA(p_i.1) == FPA(p_j.1)
        })
        .collect_vec();
    //remove points in reverse order to avoid shifting indices
    indices_to_remove.sort_unstable_by(|a, b| b.cmp(a));
    for index in indices_to_remove {
        if index < points.len() && points.len() > 1 {
            let j = (index + 1) % points.len();
            warn!(
                "[IMPORT] degenerate point of input simple polygon eliminated (idx: {}, {:?}, {:?})",
                index, points[index], points[j]
            );
            points.remove(index);
        }
    }
}

use anyhow::{Result, ensure};
use itertools::Itertools;

use crate::entities::{PairPiece, Piece, SameTypePiece, Sheet};

/// Static representation of a nesting problem: the pieces to place and the sheets to place them on.
/// Piece and sheet ids equal their index.
#[derive(Clone, Debug)]
pub struct Instance {
    pub pieces: Vec<Piece>,
    pub sheets: Vec<Sheet>,
    pub same_type_pieces: Vec<SameTypePiece>,
    pub pair_pieces: Vec<PairPiece>,
}

impl Instance {
    pub fn new(
        pieces: Vec<Piece>,
        sheets: Vec<Sheet>,
        same_type_pieces: Vec<SameTypePiece>,
        pair_pieces: Vec<PairPiece>,
    ) -> Result<Instance> {
        ensure!(!sheets.is_empty(), "instance contains no sheets");
        ensure!(
            pieces.iter().enumerate().all(|(i, p)| p.id == i),
            "piece ids must be 0..n in order, got {:?}",
            pieces.iter().map(|p| p.id).collect_vec()
        );
        ensure!(
            sheets.iter().enumerate().all(|(i, s)| s.id == i),
            "sheet ids must be 0..n in order, got {:?}",
            sheets.iter().map(|s| s.id).collect_vec()
        );
        for family in &same_type_pieces {
            ensure!(
                family.piece_ids.iter().all(|id| *id < pieces.len()),
                "same type family {} refers to unknown pieces: {:?}",
                family.id,
                family.piece_ids
            );
        }
        for pair in &pair_pieces {
            ensure!(
                pair.left < pieces.len() && pair.right < pieces.len(),
                "pair {} refers to unknown pieces ({}, {})",
                pair.id,
                pair.left,
                pair.right
            );
            ensure!(
                pair.size.is_finite(),
                "pair {} has a non-finite size",
                pair.id
            );
        }
        Ok(Instance {
            pieces,
            sheets,
            same_type_pieces,
            pair_pieces,
        })
    }

    pub fn piece(&self, id: usize) -> &Piece {
        &self.pieces[id]
    }

    pub fn sheet(&self, id: usize) -> &Sheet {
        &self.sheets[id]
    }

    /// Total number of instances to place
    pub fn total_piece_qty(&self) -> usize {
        self.pieces.iter().map(|p| p.quantity).sum()
    }

    /// The same type family `piece_id` belongs to, if any
    pub fn family_of(&self, piece_id: usize) -> Option<&SameTypePiece> {
        self.same_type_pieces.iter().find(|f| f.contains(piece_id))
    }
}

mod instance;
mod layout;
mod piece;
mod placed_item;
mod placed_piece;
mod relations;
mod sheet;

#[doc(inline)]
pub use instance::Instance;

#[doc(inline)]
pub use layout::Layout;

#[doc(inline)]
pub use piece::Piece;

#[doc(inline)]
pub use placed_item::{PItemKey, PlacedItem};

#[doc(inline)]
pub use placed_piece::PlacedPiece;

#[doc(inline)]
pub use relations::{PairPiece, SameTypePiece};

#[doc(inline)]
pub use sheet::{Margins, Sheet, SheetKind};

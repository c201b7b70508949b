mod chromosome;
mod optimizer;
mod rect_packer;

#[doc(inline)]
pub use chromosome::Chromosome;
#[doc(inline)]
pub use optimizer::{GaOptimizer, GaResult};
#[doc(inline)]
pub use rect_packer::{Decoded, EmptyRectArea, MinRect, PackingProblem, RectPacker, RectPlacement};

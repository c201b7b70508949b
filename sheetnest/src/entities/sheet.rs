use anyhow::{Result, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::geometry::primitives::Rect;

/// Kind of material a sheet represents
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SheetKind {
    /// A rectangular sheet of fixed size
    Whole,
    /// Continuous material, bounded in width and unbounded along the feed axis (+y)
    Strip,
    /// A discrete package, bounded like a whole sheet
    Package,
}

/// Unusable border on each side of a sheet
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub right: f64,
}

/// Material to nest pieces on
#[derive(Clone, Debug, PartialEq)]
pub struct Sheet {
    pub id: usize,
    pub kind: SheetKind,
    pub width: f64,
    /// Always present for whole sheets and packages, ignored for strips
    pub height: Option<f64>,
    pub margins: Margins,
}

impl Sheet {
    pub fn new(
        id: usize,
        kind: SheetKind,
        width: f64,
        height: Option<f64>,
        margins: Margins,
    ) -> Result<Sheet> {
        ensure!(
            width.is_finite() && width > 0.0,
            "sheet {id} has a non-positive width: {width}"
        );
        let Margins {
            top,
            bottom,
            left,
            right,
        } = margins;
        ensure!(
            [top, bottom, left, right]
                .iter()
                .all(|m| m.is_finite() && *m >= 0.0),
            "sheet {id} has invalid margins: {margins:?}"
        );
        ensure!(
            left + right < width,
            "margins of sheet {id} leave no usable width"
        );
        let height = match (kind, height) {
            (SheetKind::Strip, _) => None,
            (_, None) => bail!("sheet {id} of kind {kind:?} requires a height"),
            (_, Some(h)) => {
                ensure!(
                    h.is_finite() && h > 0.0,
                    "sheet {id} has a non-positive height: {h}"
                );
                ensure!(
                    top + bottom < h,
                    "margins of sheet {id} leave no usable height"
                );
                Some(h)
            }
        };
        Ok(Sheet {
            id,
            kind,
            width,
            height,
            margins,
        })
    }

    pub fn is_strip(&self) -> bool {
        self.kind == SheetKind::Strip
    }

    /// The region in which pieces may be placed.
    /// For strips, which are unbounded along y, the region ends at `strip_horizon`.
    pub fn usable_rect(&self, strip_horizon: f64) -> Rect {
        let Margins {
            top,
            bottom,
            left,
            right,
        } = self.margins;
        let y_max = match self.height {
            Some(h) => h - top,
            None => strip_horizon.max(bottom),
        };
        Rect {
            x_min: left,
            y_min: bottom,
            x_max: self.width - right,
            y_max,
        }
    }

    pub fn usable_width(&self) -> f64 {
        self.width - self.margins.left - self.margins.right
    }

    /// Usable area of a bounded sheet, `None` for strips
    pub fn usable_area(&self) -> Option<f64> {
        self.height
            .map(|h| self.usable_width() * (h - self.margins.top - self.margins.bottom))
    }

    /// A copy of this sheet with another id
    pub fn clone_with_id(&self, id: usize) -> Sheet {
        Sheet { id, ..self.clone() }
    }
}

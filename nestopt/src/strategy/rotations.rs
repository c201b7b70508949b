use sheetnest::entities::Sheet;

use crate::config::NestConfig;
use crate::strategy::PlacementUnit;

const ANGLE_EPS: f64 = 1e-6;

/// Rotations (degrees, in [0, 360)) a unit may take on `sheet`, in the order they are tried
pub fn rotation_set(unit: &PlacementUnit, sheet: &Sheet, config: &NestConfig) -> Vec<f64> {
    let aligned = match (sheet.is_strip() && config.strategies.reference_line, unit.reference_angle) {
        (true, Some(angle)) => {
            let angle = angle.to_degrees();
            Some(vec![angle, angle + 180.0])
        }
        _ => None,
    };

    let mut rotations = aligned.unwrap_or_else(|| {
        let mut base = vec![0.0];
        if config.nest_type.is_double_row() {
            base.push(180.0);
        }
        if config.rotatable {
            base.extend(
                (1..4)
                    .map(|k| k as f64 * 90.0)
                    .take_while(|r| *r <= config.max_rotate_angle + ANGLE_EPS),
            );
        }
        base
    });

    if unit.extended {
        let step = config.tail_rotation_step;
        let n_steps = (360.0 / step - ANGLE_EPS).ceil() as usize;
        rotations.extend((1..n_steps).map(|k| k as f64 * step));
    }

    rotations
        .into_iter()
        .map(|r| r.rem_euclid(360.0))
        .fold(vec![], |mut acc: Vec<f64>, r| {
            if !acc.iter().any(|a| angles_equal(*a, r)) {
                acc.push(r);
            }
            acc
        })
}

fn angles_equal(a: f64, b: f64) -> bool {
    let d = (a - b).rem_euclid(360.0);
    d < ANGLE_EPS || 360.0 - d < ANGLE_EPS
}

#[cfg(test)]
mod tests {
    use std::f64::consts::FRAC_PI_2;

    use sheetnest::collision_detection::CollisionShape;
    use sheetnest::entities::{Margins, SheetKind};
    use sheetnest::geometry::primitives::Point;

    use super::*;
    use crate::config::NestType;
    use crate::strategy::{Spacing, UnitKey};

    fn unit(shape: &CollisionShape, reference_angle: Option<f64>, extended: bool) -> PlacementUnit<'_> {
        PlacementUnit {
            key: UnitKey::Piece(0),
            shape,
            spacing: Spacing::new(&NestConfig::default(), 0, 0),
            reference_angle,
            serial: 0,
            extended,
        }
    }

    fn sheet(kind: SheetKind) -> Sheet {
        Sheet::new(0, kind, 100.0, Some(100.0), Margins::default()).unwrap()
    }

    #[test]
    fn nest_type_and_rotatable_define_the_set() {
        let shape = CollisionShape::Point(Point(0.0, 0.0));
        let whole = sheet(SheetKind::Whole);

        let single = NestConfig::default();
        assert_eq!(rotation_set(&unit(&shape, None, false), &whole, &single), vec![0.0]);

        let double = NestConfig {
            nest_type: NestType::DoubleRow,
            ..single
        };
        assert_eq!(rotation_set(&unit(&shape, None, false), &whole, &double), vec![0.0, 180.0]);

        let rotatable = NestConfig {
            nest_type: NestType::DoubleRow,
            rotatable: true,
            max_rotate_angle: 180.0,
            ..single
        };
        assert_eq!(
            rotation_set(&unit(&shape, None, false), &whole, &rotatable),
            vec![0.0, 180.0, 90.0]
        );
    }

    #[test]
    fn reference_line_aligns_on_strips_only() {
        let shape = CollisionShape::Point(Point(0.0, 0.0));
        let config = NestConfig {
            strategies: crate::config::Strategies {
                reference_line: true,
                ..Default::default()
            },
            ..NestConfig::default()
        };
        let u = unit(&shape, Some(FRAC_PI_2), false);
        let on_strip = rotation_set(&u, &sheet(SheetKind::Strip), &config);
        assert_eq!(on_strip.len(), 2);
        assert!((on_strip[0] - 90.0).abs() < 1e-9 && (on_strip[1] - 270.0).abs() < 1e-9);

        assert_eq!(rotation_set(&u, &sheet(SheetKind::Whole), &config), vec![0.0]);
    }

    #[test]
    fn extended_set_adds_tail_rotations() {
        let shape = CollisionShape::Point(Point(0.0, 0.0));
        let config = NestConfig {
            nest_type: NestType::DoubleRow,
            tail_rotation_step: 90.0,
            ..NestConfig::default()
        };
        let set = rotation_set(&unit(&shape, None, true), &sheet(SheetKind::Whole), &config);
        assert_eq!(set, vec![0.0, 180.0, 90.0, 270.0]);
    }
}

use svg::Document;
use svg::node::element::{Definitions, Group, Title, Use};

use crate::collision_detection::overlaps;
use crate::entities::{Instance, Layout};
use crate::geometry::DTransformation;
use crate::geometry::primitives::Rect;
use crate::io::svg::svg_util;
use crate::io::svg::svg_util::SvgDrawOptions;

/// Draws a layout. Pieces are defined once (in their local coordinates) and referenced by every placement.
pub fn layout_to_svg(layout: &Layout, instance: &Instance, options: SvgDrawOptions) -> Document {
    let sheet = &layout.sheet;
    let region = layout.region;
    let sheet_height = match sheet.height {
        Some(h) => h,
        //strips are drawn up to the used length
        None => region.y_min + layout.used_length() + sheet.margins.top,
    };
    let sheet_bbox = Rect {
        x_min: 0.0,
        y_min: 0.0,
        x_max: sheet.width,
        y_max: sheet_height.max(region.y_min + f64::EPSILON),
    };
    let vbox = sheet_bbox.inflate(sheet_bbox.width() * 0.025, sheet_bbox.height() * 0.025);

    let theme = &options.theme;

    let stroke_width =
        f32::min(vbox.width() as f32, vbox.height() as f32) * 0.001 * theme.stroke_width_multiplier;

    //draw sheet
    let sheet_group = {
        let title = Title::new(format!(
            "sheet, id: {}, kind: {:?}, width: {:.3}, height: {:.3}",
            sheet.id, sheet.kind, sheet.width, sheet_height
        ));
        let usable = Rect {
            y_max: region.y_max.min(sheet_height - sheet.margins.top),
            ..region
        };
        Group::new()
            .set("id", format!("sheet_{}", sheet.id))
            .add(svg_util::data_to_path(
                svg_util::aa_rect_data(sheet_bbox),
                &[
                    ("fill", &*format!("{}", theme.margin_fill)),
                    ("stroke", "black"),
                    ("stroke-width", &*format!("{}", 2.0 * stroke_width)),
                ],
            ))
            .add(svg_util::data_to_path(
                svg_util::aa_rect_data(usable),
                &[
                    ("fill", &*format!("{}", theme.sheet_fill)),
                    ("stroke", "none"),
                ],
            ))
            .add(title)
    };

    //draw pieces
    let pieces_group = {
        let mut piece_defs = Definitions::new();
        for piece in instance.pieces.iter() {
            let mut piece_def = Group::new()
                .set("id", format!("piece_{}", piece.id))
                .add(svg_util::data_to_path(
                    svg_util::simple_polygon_data(&piece.shape),
                    &[
                        ("stroke-width", &*format!("{}", stroke_width)),
                        ("fill-rule", "nonzero"),
                        ("stroke", "black"),
                        ("opacity", "0.9"),
                    ],
                ));
            if options.draw_cd_shapes {
                for part in piece.collision_shape.convex_parts() {
                    piece_def = piece_def.add(svg_util::data_to_path(
                        svg_util::points_data(&part.points),
                        &[
                            ("fill", "none"),
                            ("stroke", "black"),
                            ("stroke-width", &*format!("{}", 0.5 * stroke_width)),
                            ("stroke-dasharray", &*format!("{}", 5.0 * stroke_width)),
                        ],
                    ));
                }
            }
            piece_defs = piece_defs.add(piece_def);
        }
        let mut pieces_group = Group::new().set("id", "pieces").add(piece_defs);

        for (pk, pi) in layout.placed_items.iter() {
            let colliding = options.highlight_collisions
                && layout
                    .placed_items
                    .iter()
                    .any(|(k, other)| k != pk && overlaps(&pi.shape, &other.shape));
            let fill = match (colliding, pi.pair_id) {
                (true, _) => theme.collision_highlight_color,
                (false, Some(_)) => theme.pair_fill,
                (false, None) => theme.piece_fill,
            };
            let title = Title::new(format!(
                "piece, id: {}, instance: {}, transf: [{}]",
                pi.piece_id, pi.instance, pi.d_transf
            ));
            let pi_ref = Use::new()
                .set("transform", transform_to_svg(pi.d_transf))
                .set("xlink:href", format!("#piece_{}", pi.piece_id))
                .set("fill", format!("{fill}"))
                .add(title);

            pieces_group = pieces_group.add(pi_ref);
        }
        pieces_group
    };

    let qt_group = match options.quadtree {
        false => None,
        true => {
            let (occupied, empty) = svg_util::quad_tree_data(&layout.cde().quadtree);
            let qt_group = Group::new()
                .set("id", "quadtree")
                .add(svg_util::data_to_path(
                    occupied,
                    &[
                        ("fill", "red"),
                        ("stroke-width", &*format!("{}", stroke_width * 0.25)),
                        ("fill-opacity", "0.3"),
                        ("stroke", "black"),
                    ],
                ))
                .add(svg_util::data_to_path(
                    empty,
                    &[
                        ("fill", "none"),
                        ("stroke-width", &*format!("{}", stroke_width * 0.25)),
                        ("stroke", "black"),
                    ],
                ));
            Some(qt_group)
        }
    };

    let vbox_svg = (
        vbox.x_min as f32,
        vbox.y_min as f32,
        vbox.width() as f32,
        vbox.height() as f32,
    );

    let optionals = [qt_group]
        .into_iter()
        .flatten()
        .fold(Group::new().set("id", "optionals"), |g, opt| g.add(opt));

    Document::new()
        .set("viewBox", vbox_svg)
        .set("xmlns:xlink", "http://www.w3.org/1999/xlink")
        .add(sheet_group)
        .add(pieces_group)
        .add(optionals)
}

fn transform_to_svg(dt: DTransformation) -> String {
    //https://developer.mozilla.org/en-US/docs/Web/SVG/Attribute/transform
    //operations are effectively applied from right to left
    let (tx, ty) = dt.translation();
    let r = dt.rotation().to_degrees();
    format!("translate({tx} {ty}), rotate({r})")
}

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use svg::node::element::path::Data;
use svg::node::element::{Circle, Path};

use crate::collision_detection::quadtree::QTNode;
use crate::geometry::primitives::{Point, Rect, SPolygon};

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, Copy)]
pub struct SvgDrawOptions {
    ///The theme to use for the svg
    #[serde(default)]
    pub theme: SvgLayoutTheme,
    ///Draw the quadtree on top
    #[serde(default)]
    pub quadtree: bool,
    ///Draw the convex parts used for collision detection on top of each piece
    #[serde(default)]
    pub draw_cd_shapes: bool,
    ///Fill overlapping pieces with the highlight color
    #[serde(default)]
    pub highlight_collisions: bool,
}

impl Default for SvgDrawOptions {
    fn default() -> Self {
        Self {
            theme: SvgLayoutTheme::default(),
            quadtree: false,
            draw_cd_shapes: false,
            highlight_collisions: true,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize, Copy)]
pub struct SvgLayoutTheme {
    pub stroke_width_multiplier: f32,
    pub sheet_fill: Color,
    pub margin_fill: Color,
    pub piece_fill: Color,
    pub pair_fill: Color,
    pub collision_highlight_color: Color,
}

impl Default for SvgLayoutTheme {
    fn default() -> Self {
        SvgLayoutTheme::EARTH_TONES
    }
}

impl SvgLayoutTheme {
    pub const EARTH_TONES: SvgLayoutTheme = SvgLayoutTheme {
        stroke_width_multiplier: 2.0,
        sheet_fill: Color(0xCC, 0x82, 0x4A),
        margin_fill: Color(0x8C, 0x52, 0x2A),
        piece_fill: Color(0xFF, 0xC8, 0x79),
        pair_fill: Color(0xFF, 0xA5, 0x00),
        collision_highlight_color: Color(0x00, 0xFF, 0x00), // LIME
    };

    pub const GRAY: SvgLayoutTheme = SvgLayoutTheme {
        stroke_width_multiplier: 2.5,
        sheet_fill: Color(0xD3, 0xD3, 0xD3),
        margin_fill: Color(0xA0, 0xA0, 0xA0),
        piece_fill: Color(0x7A, 0x7A, 0x7A),
        pair_fill: Color(0x63, 0x63, 0x63),
        collision_highlight_color: Color(0xD0, 0x00, 0x00),
    };
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Color(pub u8, pub u8, pub u8);

impl Display for Color {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        ensure!(
            hex.len() == 6 && hex.is_ascii(),
            "invalid color, expected #RRGGBB: {s}"
        );
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16).with_context(|| format!("invalid color: {s}"))
        };
        Ok(Color(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<<S as Serializer>::Ok, <S as Serializer>::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{self}"))
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, <D as Deserializer<'de>>::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Color::from_str(&s).map_err(serde::de::Error::custom)
    }
}

pub fn simple_polygon_data(s_poly: &SPolygon) -> Data {
    points_data(&s_poly.vertices)
}

pub fn points_data(points: &[Point]) -> Data {
    let mut data = Data::new();
    for (i, Point(x, y)) in points.iter().enumerate() {
        data = match i {
            0 => data.move_to((*x as f32, *y as f32)),
            _ => data.line_to((*x as f32, *y as f32)),
        };
    }
    data.close()
}

/// Outlines of all leaf nodes of the quadtree: (occupied, empty)
pub fn quad_tree_data<K: Copy + Ord>(qt_root: &QTNode<K>) -> (Data, Data) {
    qt_node_data(qt_root, Data::new(), Data::new())
}

fn qt_node_data<K: Copy + Ord>(
    qt_node: &QTNode<K>,
    mut data_occupied: Data,
    mut data_empty: Data,
) -> (Data, Data) {
    //Only draw qt_nodes that do not have a child
    match &qt_node.children {
        Some(children) => {
            for child in children.iter() {
                (data_occupied, data_empty) = qt_node_data(child, data_occupied, data_empty);
            }
        }
        None => match qt_node.occupants.is_empty() {
            false => data_occupied = rect_data(data_occupied, &qt_node.bbox),
            true => data_empty = rect_data(data_empty, &qt_node.bbox),
        },
    }
    (data_occupied, data_empty)
}

fn rect_data(data: Data, rect: &Rect) -> Data {
    data.move_to((rect.x_min as f32, rect.y_min as f32))
        .line_to((rect.x_max as f32, rect.y_min as f32))
        .line_to((rect.x_max as f32, rect.y_max as f32))
        .line_to((rect.x_min as f32, rect.y_max as f32))
        .close()
}

pub fn aa_rect_data(rect: Rect) -> Data {
    rect_data(Data::new(), &rect)
}

pub fn data_to_path(data: Data, params: &[(&str, &str)]) -> Path {
    let mut path = Path::new();
    for param in params {
        path = path.set(param.0, param.1)
    }
    path.set("d", data)
}

pub fn point(Point(x, y): Point, fill: Option<&str>, rad: Option<f32>) -> Circle {
    Circle::new()
        .set("cx", x as f32)
        .set("cy", y as f32)
        .set("r", rad.unwrap_or(0.5))
        .set("fill", fill.unwrap_or("black"))
}

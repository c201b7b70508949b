use serde::{Deserialize, Serialize};

///Configuration of the Collision Detection Engine
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct CDEConfig {
    ///Maximum depth of the quadtree
    pub quadtree_depth: u8,
    ///A quadtree node splits into four children once it holds more occupants than this
    pub quadtree_split_threshold: usize,
}

impl Default for CDEConfig {
    fn default() -> Self {
        Self {
            quadtree_depth: 5,
            quadtree_split_threshold: 8,
        }
    }
}

use crate::geometry::geo_enums::GeoRelation;
use crate::geometry::geo_traits::CollidesWith;
use crate::geometry::primitives::Rect;

/// Quadtree node, indexing the bounding boxes of registered entities.
/// Occupants that do not fit in any of the children (because they lie outside of the root) are kept on the node itself.
#[derive(Clone, Debug)]
pub struct QTNode<K> {
    /// The level of the node in the tree, 0 being the bottom-most level
    pub level: u8,
    /// The bounding box of the node
    pub bbox: Rect,
    /// The children of the node, if any
    pub children: Option<Box<[QTNode<K>; 4]>>,
    /// Entities stored in this node, with their bounding boxes
    pub occupants: Vec<(K, Rect)>,
    /// Number of occupants a leaf may hold before it is split
    pub split_threshold: usize,
}

impl<K: Copy + Ord> QTNode<K> {
    pub fn new(level: u8, bbox: Rect, split_threshold: usize) -> Self {
        QTNode {
            level,
            bbox,
            children: None,
            occupants: vec![],
            split_threshold,
        }
    }

    /// Registers an entity. Entities reaching outside of `self.bbox` are kept on this node,
    /// so they can still be found by queries outside of the tree's extent.
    pub fn insert(&mut self, key: K, bbox: Rect) {
        match self.bbox.relation_to(bbox) {
            GeoRelation::Surrounding => self.register(key, bbox),
            _ => self.occupants.push((key, bbox)),
        }
    }

    fn register(&mut self, key: K, bbox: Rect) {
        match self.children.as_mut() {
            Some(children) => {
                if !insert_into_children(children, key, bbox) {
                    self.occupants.push((key, bbox));
                }
            }
            None => {
                self.occupants.push((key, bbox));
                if self.occupants.len() > self.split_threshold && self.level > 0 {
                    self.split();
                }
            }
        }
    }

    fn split(&mut self) {
        let mut children = Box::new(
            self.bbox
                .quadrants()
                .map(|quad| QTNode::new(self.level - 1, quad, self.split_threshold)),
        );
        //occupants overlapping none of the children stay on this node
        self.occupants
            .retain(|(key, bbox)| !insert_into_children(&mut children, *key, *bbox));
        self.children = Some(children);
    }

    /// Returns the keys of all occupants whose bounding box touches `region`, sorted and without duplicates
    pub fn query(&self, region: &Rect) -> Vec<K> {
        let mut found = vec![];
        self.collect(region, &mut found);
        found.sort();
        found.dedup();
        found
    }

    fn collect(&self, region: &Rect, found: &mut Vec<K>) {
        found.extend(
            self.occupants
                .iter()
                .filter(|(_, bbox)| bbox.collides_with(region))
                .map(|(key, _)| *key),
        );
        if let Some(children) = &self.children {
            children
                .iter()
                .filter(|child| child.bbox.collides_with(region))
                .for_each(|child| child.collect(region, found));
        }
    }

    /// Removes all occupants and children
    pub fn clear(&mut self) {
        self.children = None;
        self.occupants.clear();
    }

    /// Total number of occupant entries in the subtree, an entity spanning several nodes is counted once per node
    pub fn n_entries(&self) -> usize {
        self.occupants.len()
            + self
                .children
                .as_ref()
                .map_or(0, |c| c.iter().map(|child| child.n_entries()).sum())
    }
}

/// Inserts into every overlapping child, returns false if none of them overlap
fn insert_into_children<K: Copy + Ord>(children: &mut [QTNode<K>; 4], key: K, bbox: Rect) -> bool {
    let mut inserted = false;
    for child in children.iter_mut() {
        if child.bbox.collides_with(&bbox) {
            child.register(key, bbox);
            inserted = true;
        }
    }
    inserted
}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rand::prelude::SmallRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    fn random_rect(rng: &mut SmallRng, extent: f64) -> Rect {
        let x = rng.random_range(-10.0..extent);
        let y = rng.random_range(-10.0..extent);
        let w = rng.random_range(0.5..15.0);
        let h = rng.random_range(0.5..15.0);
        Rect::try_new(x, y, x + w, y + h).unwrap()
    }

    #[test]
    fn query_matches_brute_force() {
        let mut rng = SmallRng::seed_from_u64(0);
        let root = Rect::try_new(0.0, 0.0, 100.0, 100.0).unwrap();
        let mut qt = QTNode::new(5, root, 4);
        let rects = (0..300).map(|_| random_rect(&mut rng, 110.0)).collect_vec();
        for (i, r) in rects.iter().enumerate() {
            qt.insert(i, *r);
        }
        assert!(qt.children.is_some());

        for _ in 0..200 {
            let region = random_rect(&mut rng, 110.0);
            let expected = (0..rects.len())
                .filter(|&i| rects[i].collides_with(&region))
                .collect_vec();
            assert_eq!(qt.query(&region), expected);
        }
    }

    #[test]
    fn clear_empties_the_tree() {
        let root = Rect::try_new(0.0, 0.0, 10.0, 10.0).unwrap();
        let mut qt = QTNode::new(3, root, 1);
        for i in 0..10 {
            let x = i as f64;
            qt.insert(i, Rect::try_new(x, x, x + 0.5, x + 0.5).unwrap());
        }
        assert!(qt.n_entries() >= 10);
        qt.clear();
        assert_eq!(qt.n_entries(), 0);
        assert!(qt.query(&root).is_empty());
    }
}

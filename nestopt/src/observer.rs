use sheetnest::geometry::primitives::{Point, Rect};

/// Events emitted while nesting. They are purely informative: observers cannot influence the search.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum NestEvent {
    /// Percentage of instances attempted so far, non-decreasing
    Progress(u8),
    /// A copy of the last sheet was added because a unit did not fit anywhere
    AutoRepeatedLastSheet { sheet_id: usize },
    Placed {
        piece_id: usize,
        instance: usize,
        sheet_id: usize,
    },
    Unplaced { piece_id: usize, instance: usize },
    /// A candidate point was evaluated
    Probe { sheet_id: usize, point: Point },
    /// A candidate position was rejected, `rect` is the bounding box of the rejected shape
    RejectedRect { sheet_id: usize, rect: Rect },
    /// A compaction run moved a shape from `from` to `to` (positions of its bounding box minimum)
    CompactionTrial {
        sheet_id: usize,
        from: Point,
        to: Point,
    },
}

pub trait NestObserver {
    fn notify(&mut self, event: NestEvent);
}

impl<F: FnMut(NestEvent)> NestObserver for F {
    fn notify(&mut self, event: NestEvent) {
        self(event)
    }
}

/// Observer that ignores everything
#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl NestObserver for Silent {
    fn notify(&mut self, _event: NestEvent) {}
}

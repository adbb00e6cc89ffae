use getaway_core::{LaneIndex, TrafficId};

/// Resolves whether a registered car is still live and where it currently is.
pub trait TrafficLookup {
    /// Forward position of the car if it is still active, or `None` once it
    /// has been retired or removed through any path.
    fn live_position(&self, traffic: TrafficId) -> Option<f32>;
}

/// Ordered collection of the cars registered in a single lane.
#[derive(Clone, Debug, Default)]
pub struct LaneOccupancy {
    occupants: Vec<TrafficId>,
}

impl LaneOccupancy {
    /// Number of entries currently stored, including stale ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.occupants.len()
    }

    /// Reports whether the lane holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.occupants.is_empty()
    }

    /// Registered identifiers in insertion order.
    #[must_use]
    pub fn occupants(&self) -> &[TrafficId] {
        &self.occupants
    }

    fn insert(&mut self, traffic: TrafficId) {
        self.occupants.push(traffic);
    }

    fn remove(&mut self, traffic: TrafficId) {
        if let Some(index) = self.occupants.iter().position(|entry| *entry == traffic) {
            let _ = self.occupants.remove(index);
        }
    }

    fn purge<L>(&mut self, lookup: &L)
    where
        L: TrafficLookup + ?Sized,
    {
        self.occupants
            .retain(|traffic| lookup.live_position(*traffic).is_some());
    }

    fn frontmost<L>(&self, lookup: &L) -> Option<TrafficId>
    where
        L: TrafficLookup + ?Sized,
    {
        let mut best: Option<(TrafficId, f32)> = None;
        for traffic in &self.occupants {
            let Some(position) = lookup.live_position(*traffic) else {
                continue;
            };
            match best {
                Some((_, best_position)) if position <= best_position => {}
                _ => best = Some((*traffic, position)),
            }
        }
        best.map(|(traffic, _)| traffic)
    }
}

/// Per-lane registry of live traffic answering "frontmost car in lane L".
///
/// Lanes are fixed at construction. Every mutation addressed to a lane outside
/// that range is ignored, so callers never corrupt the registry with a bad
/// index. Entries may outlive their cars (a car removed through an unrelated
/// path); [`LaneRegistry::frontmost`] purges those before answering.
#[derive(Clone, Debug)]
pub struct LaneRegistry {
    lanes: Vec<LaneOccupancy>,
}

impl LaneRegistry {
    /// Creates a registry with `lane_count` empty lanes.
    #[must_use]
    pub fn new(lane_count: usize) -> Self {
        Self {
            lanes: vec![LaneOccupancy::default(); lane_count],
        }
    }

    /// Number of lanes tracked by the registry.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Stored entries of a lane, if it exists.
    #[must_use]
    pub fn lane(&self, lane: LaneIndex) -> Option<&LaneOccupancy> {
        self.lanes.get(lane.index())
    }

    /// Appends the car to the lane; no-op for an out-of-range lane.
    pub fn register(&mut self, traffic: TrafficId, lane: LaneIndex) {
        if let Some(occupancy) = self.lanes.get_mut(lane.index()) {
            occupancy.insert(traffic);
        }
    }

    /// Removes the car from the lane.
    ///
    /// Idempotent: unregistering a car that is not present is a no-op, as is
    /// addressing an out-of-range lane.
    pub fn unregister(&mut self, traffic: TrafficId, lane: LaneIndex) {
        if let Some(occupancy) = self.lanes.get_mut(lane.index()) {
            occupancy.remove(traffic);
        }
    }

    /// Live car with the greatest forward position in the lane.
    ///
    /// Entries whose car is no longer active are purged from the lane first.
    pub fn frontmost<L>(&mut self, lane: LaneIndex, lookup: &L) -> Option<TrafficId>
    where
        L: TrafficLookup + ?Sized,
    {
        let occupancy = self.lanes.get_mut(lane.index())?;
        occupancy.purge(lookup);
        occupancy.frontmost(lookup)
    }
}

//! Per-node LOD chains: ordered switch distances with optional fallback meshes.

/// One entry of a [`LodChain`].
#[derive(Clone, Debug, PartialEq)]
pub struct LodLevel<T> {
    /// Camera distance at which this level becomes active.
    pub distance: f32,
    /// Mesh shown instead of the base node, or `None` to keep showing the base.
    pub fallback: Option<T>,
}

/// LOD levels attached to a base node, kept sorted by distance.
#[derive(Clone, Debug, PartialEq)]
pub struct LodChain<T> {
    levels: Vec<LodLevel<T>>,
}

impl<T> Default for LodChain<T> {
    fn default() -> Self {
        Self { levels: Vec::new() }
    }
}

impl<T> LodChain<T> {
    /// Create an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a level. A level already registered at the same distance is replaced.
    pub fn add_level(&mut self, distance: f32, fallback: Option<T>) {
        let level = LodLevel { distance, fallback };
        match self
            .levels
            .binary_search_by(|l| l.distance.total_cmp(&distance))
        {
            Ok(i) => self.levels[i] = level,
            Err(i) => self.levels.insert(i, level),
        }
    }

    /// The level active at `distance`: the farthest one whose distance is
    /// `<= distance`. `None` means the base node itself is active.
    pub fn active_level(&self, distance: f32) -> Option<&LodLevel<T>> {
        self.levels.iter().rev().find(|l| l.distance <= distance)
    }

    /// The fallback to display at `distance`, or `None` when the base node shows.
    pub fn resolve(&self, distance: f32) -> Option<&T> {
        self.active_level(distance)
            .and_then(|l| l.fallback.as_ref())
    }

    /// Every fallback registered on this chain.
    pub fn fallbacks(&self) -> impl Iterator<Item = &T> {
        self.levels.iter().filter_map(|l| l.fallback.as_ref())
    }

    /// Levels in ascending distance order.
    pub fn levels(&self) -> &[LodLevel<T>] {
        &self.levels
    }

    /// Whether no level has been added.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Remove every level whose fallback matches `predicate`.
    pub fn remove_fallbacks(&mut self, mut predicate: impl FnMut(&T) -> bool) {
        self.levels
            .retain(|l| !l.fallback.as_ref().is_some_and(&mut predicate));
    }
}

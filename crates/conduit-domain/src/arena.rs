/// A stable index into a [`ChildArena`]. Stays valid across removals of
/// other children; a removed slot is tombstoned in place rather than
/// shifting later indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChildRef(usize);

/// An aggregate-owned collection of child value objects, addressed by
/// [`ChildRef`] instead of a pointer back to the parent.
#[derive(Debug, Clone, Default)]
pub struct ChildArena<T> {
    slots: Vec<Option<T>>,
}

impl<T> ChildArena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn insert(&mut self, child: T) -> ChildRef {
        let index = self.slots.len();
        self.slots.push(Some(child));
        ChildRef(index)
    }

    #[must_use]
    pub fn get(&self, reference: ChildRef) -> Option<&T> {
        self.slots.get(reference.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, reference: ChildRef) -> Option<&mut T> {
        self.slots.get_mut(reference.0).and_then(Option::as_mut)
    }

    /// Remove a child, leaving its slot tombstoned so every other
    /// [`ChildRef`] already handed out stays valid.
    pub fn remove(&mut self, reference: ChildRef) -> Option<T> {
        self.slots.get_mut(reference.0).and_then(Option::take)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|c| c.is_some()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChildRef, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_ref().map(|c| (ChildRef(i), c)))
    }
}

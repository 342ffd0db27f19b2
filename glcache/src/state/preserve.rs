use std::ops::{Deref, DerefMut};

use crate::{backend::GraphicsBackend, state::StateCache};

/// Preserved-state scope returned by [`StateCache::preserve`].
///
/// Changes made through the guard are undone when it drops, on every exit path
/// including unwinding. Handles destroyed inside the scope are not rebound.
pub struct PreservedState<'a, B: GraphicsBackend> {
    cache: &'a mut StateCache<B>,
    depth: usize,
}

impl<'a, B: GraphicsBackend> PreservedState<'a, B> {
    pub(super) fn new(cache: &'a mut StateCache<B>, depth: usize) -> Self {
        Self { cache, depth }
    }
}

impl<B: GraphicsBackend> Deref for PreservedState<'_, B> {
    type Target = StateCache<B>;

    fn deref(&self) -> &Self::Target {
        self.cache
    }
}

impl<B: GraphicsBackend> DerefMut for PreservedState<'_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.cache
    }
}

impl<B: GraphicsBackend> Drop for PreservedState<'_, B> {
    fn drop(&mut self) {
        self.cache.pop_preserved(self.depth);
    }
}

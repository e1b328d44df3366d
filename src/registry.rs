//! Memoized lookup of bound elements by name.
use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};
use tracing::trace;

use crate::attrs::NativeProps;
use crate::context::Scope;
use crate::enhancer::Enhanced;
use crate::factory::ElementFactory;
use crate::tags::{ElementKind, Tag};

type Cache<F> = Mutex<HashMap<String, Arc<Enhanced<F>>>>;

/// Owns the rendering factory and hands out one [`Enhanced`] per name, so
/// repeated lookups are referentially stable.
pub struct Registry<F: ElementFactory> {
    factory: Arc<F>,
    elements: Cache<F>,
    components: Cache<F>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<F: ElementFactory> Registry<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory: Arc::new(factory),
            elements: Mutex::new(HashMap::new()),
            components: Mutex::new(HashMap::new()),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Bound element for `name`. Names outside the tag table become custom
    /// elements.
    pub fn get(&self, name: &str) -> Arc<Enhanced<F>> {
        let mut elements = lock(&self.elements);
        let enhanced = elements.entry(name.to_string()).or_insert_with(|| {
            trace!(name, "building bound element");
            Arc::new(Enhanced::element(
                Arc::clone(&self.factory),
                ElementKind::parse(name),
            ))
        });
        Arc::clone(enhanced)
    }

    pub fn tag(&self, tag: Tag) -> Arc<Enhanced<F>> {
        self.get(tag.as_str())
    }

    /// Wrap a render function under `name`. The first registration of a
    /// name wins; later calls return it unchanged.
    pub fn component(
        &self,
        name: &str,
        render: impl Fn(&Scope, NativeProps) -> F::Output + Send + Sync + 'static,
    ) -> Arc<Enhanced<F>> {
        let mut components = lock(&self.components);
        let enhanced = components.entry(name.to_string()).or_insert_with(|| {
            trace!(name, "wrapping component");
            Arc::new(Enhanced::component(Arc::clone(&self.factory), name, render))
        });
        Arc::clone(enhanced)
    }

    pub fn len(&self) -> usize {
        lock(&self.elements).len() + lock(&self.components).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every memoized entry. Handles already given out keep working.
    pub fn clear(&self) {
        lock(&self.elements).clear();
        lock(&self.components).clear();
    }
}

impl<F: ElementFactory + Default> Default for Registry<F> {
    fn default() -> Self {
        Self::new(F::default())
    }
}

impl<F: ElementFactory> fmt::Debug for Registry<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("elements", &lock(&self.elements).len())
            .field("components", &lock(&self.components).len())
            .finish()
    }
}

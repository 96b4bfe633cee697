use alloc::{boxed::Box, collections::BTreeMap, sync::Arc, vec::Vec};
use parking_lot::Mutex;
use tracing::debug;

use crate::{bind::Bind, class::MemberId, handler::BindHandler, property::Property, tag::TagInstance};

/// Resolution plan of one executable or standalone property.
///
/// Slices are parallel: index `i` of each describes parameter `i`.
pub(crate) struct InjectorCache {
    pub(crate) properties: Box<[Property]>,
    pub(crate) tags: Box<[Option<TagInstance>]>,
    pub(crate) binds: Box<[Bind]>,
    pub(crate) handlers: Box<[Box<[BindHandler]>]>,
}

impl InjectorCache {
    pub(crate) fn new(entries: Vec<CacheEntry>) -> Self {
        let len = entries.len();
        let mut properties = Vec::with_capacity(len);
        let mut tags = Vec::with_capacity(len);
        let mut binds = Vec::with_capacity(len);
        let mut handlers = Vec::with_capacity(len);

        for CacheEntry {
            property,
            tag,
            bind,
            handlers: entry_handlers,
        } in entries
        {
            properties.push(property);
            tags.push(tag);
            binds.push(bind);
            handlers.push(entry_handlers.into_boxed_slice());
        }

        Self {
            properties: properties.into_boxed_slice(),
            tags: tags.into_boxed_slice(),
            binds: binds.into_boxed_slice(),
            handlers: handlers.into_boxed_slice(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.properties.len()
    }
}

pub(crate) struct CacheEntry {
    pub(crate) property: Property,
    pub(crate) tag: Option<TagInstance>,
    pub(crate) bind: Bind,
    pub(crate) handlers: Vec<BindHandler>,
}

/// Resolution plans of one injector, keyed by member identity.
#[derive(Default)]
pub(crate) struct CacheMap {
    map: Mutex<BTreeMap<MemberId, Arc<InjectorCache>>>,
}

impl CacheMap {
    #[inline]
    pub(crate) fn get(&self, id: MemberId) -> Option<Arc<InjectorCache>> {
        self.map.lock().get(&id).cloned()
    }

    /// Inserts `cache` unless another one was inserted for `id` meanwhile, returning the cache in use.
    pub(crate) fn insert(&self, id: MemberId, cache: InjectorCache) -> Arc<InjectorCache> {
        let mut guard = self.map.lock();
        if let Some(existing) = guard.get(&id) {
            debug!("Cache computed concurrently, keeping the first one");
            return existing.clone();
        }
        let cache = Arc::new(cache);
        guard.insert(id, cache.clone());
        cache
    }
}

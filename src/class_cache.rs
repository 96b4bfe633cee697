use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::any::Any;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    any::{RcAny, TypeInfo},
    class::{Class, Component, Field, Method, Visibility},
    tag::Tag,
};

/// Class descriptors and member lists of one injector, computed once per type.
#[derive(Default)]
pub(crate) struct ClassCache {
    classes: Mutex<BTreeMap<TypeInfo, RcAny>>,
    injectable_fields: Mutex<BTreeMap<TypeInfo, RcAny>>,
    annotated_methods: Mutex<BTreeMap<(TypeInfo, TypeInfo), RcAny>>,
}

impl ClassCache {
    pub(crate) fn class<T: Component>(&self) -> Arc<Class<T>> {
        get_or_insert(&self.classes, TypeInfo::of::<T>(), T::class)
    }

    /// Fields tagged with `Inject` or `AutoConstruct` with the visibility of their declaring class,
    /// most-derived class first.
    pub(crate) fn injectable_fields<T: Component>(&self) -> Arc<Vec<(Field<T>, Visibility)>> {
        get_or_insert(&self.injectable_fields, TypeInfo::of::<T>(), || {
            self.class::<T>()
                .hierarchy()
                .flat_map(|class| {
                    class
                        .declared_fields()
                        .iter()
                        .filter(|field| field.descriptor().is_injectable())
                        .map(move |field| (field.clone(), class.visibility()))
                })
                .collect()
        })
    }

    /// Methods tagged with `A` with the visibility of their declaring class, most-derived class first.
    pub(crate) fn annotated_methods<T: Component, A: Tag>(&self) -> Arc<Vec<(Method<T>, Visibility)>> {
        get_or_insert(&self.annotated_methods, (TypeInfo::of::<T>(), TypeInfo::of::<A>()), || {
            self.class::<T>()
                .hierarchy()
                .flat_map(|class| {
                    class
                        .declared_methods()
                        .iter()
                        .filter(|method| method.has_tag::<A>())
                        .map(move |method| (method.clone(), class.visibility()))
                })
                .collect()
        })
    }
}

fn get_or_insert<K: Ord, V: Any + Send + Sync>(map: &Mutex<BTreeMap<K, RcAny>>, key: K, init: impl FnOnce() -> V) -> Arc<V> {
    if let Some(value) = map.lock().get(&key).and_then(|value| value.clone().downcast::<V>().ok()) {
        debug!(type_name = core::any::type_name::<V>(), "Found in cache");
        return value;
    }
    debug!(type_name = core::any::type_name::<V>(), "Not found in cache");

    let value = Arc::new(init());

    let mut guard = map.lock();
    if let Some(existing) = guard.get(&key).and_then(|value| value.clone().downcast::<V>().ok()) {
        return existing;
    }
    guard.insert(key, value.clone());
    value
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::ClassCache;
    use crate::{
        class::{Class, Component, Constructor, Field, Method},
        tag::{Inject, PostConstruct},
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
    };
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Service {
        value: u8,
    }

    impl Component for Service {
        fn class() -> Class<Self> {
            Class::new()
                .constructor(Constructor::new(|_| Ok(Service::default())))
                .field(Field::new::<u8>("value", |service: &mut Service, value| {
                    service.value = value.get()?;
                    Ok(())
                }))
                .field(Field::new::<u8>("injected", |_: &mut Service, _| Ok(())).tag(Inject))
                .method(Method::new("init", |_: &mut Service, _| Ok(())).tag(PostConstruct))
                .method(Method::new("other", |_: &mut Service, _| Ok(())))
        }
    }

    #[test]
    #[traced_test]
    fn test_members_cached() {
        let cache = ClassCache::default();

        assert!(Arc::ptr_eq(&cache.class::<Service>(), &cache.class::<Service>()));

        let fields = cache.injectable_fields::<Service>();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0.descriptor().property().name(), "injected");

        let methods = cache.annotated_methods::<Service, PostConstruct>();
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].0.executable().name(), "init");
        assert!(Arc::ptr_eq(&methods, &cache.annotated_methods::<Service, PostConstruct>()));
        assert!(cache.annotated_methods::<Service, Inject>().is_empty());
    }
}

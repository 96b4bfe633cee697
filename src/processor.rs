use alloc::{
    string::{String, ToString as _},
    sync::Arc,
    vec::Vec,
};
use parking_lot::RwLock;
use tracing::{debug, error};

use crate::{
    any::Value,
    bind::{Bind, BindKey},
    cache::{CacheEntry, CacheMap, InjectorCache},
    class::{Executable, FieldDescriptor},
    errors::InjectErrorKind,
    injector::Injector,
    property::{Property, PropertyKind},
    resources::Resources,
    tag::TagInstance,
};

/// Where a property is requested from, rendered into missing-bind errors.
#[derive(Clone, Copy)]
enum Origin<'a> {
    Executable(&'a Executable),
    Property,
}

impl Origin<'_> {
    fn describe(self, property: &Property) -> String {
        match (self, property.kind()) {
            (Self::Executable(executable), _) => executable.signature(),
            (Self::Property, PropertyKind::Field { declaring }) => declaring.short_name().to_string(),
            (Self::Property, PropertyKind::Parameter { .. }) => String::from("standalone property"),
        }
    }
}

/// Builds resolution plans and resolves values through them.
pub(crate) struct InjectorProcessor {
    resources: Arc<RwLock<Resources>>,
    caches: CacheMap,
}

impl InjectorProcessor {
    pub(crate) fn new(resources: Arc<RwLock<Resources>>) -> Self {
        Self {
            resources,
            caches: CacheMap::default(),
        }
    }

    #[inline]
    pub(crate) fn resources(&self) -> &Arc<RwLock<Resources>> {
        &self.resources
    }

    /// Plan for the parameters of `executable`, built on first request.
    pub(crate) fn executable_cache(&self, executable: &Executable) -> Result<Arc<InjectorCache>, InjectErrorKind> {
        if let Some(cache) = self.caches.get(executable.id()) {
            debug!(executable = %executable, "Plan found in cache");
            return Ok(cache);
        }
        debug!(executable = %executable, "Plan not found in cache");

        let resources = self.resources.read();
        let entries = executable
            .parameters()
            .iter()
            .map(|property| Self::entry(&resources, property, Origin::Executable(executable)))
            .collect::<Result<Vec<_>, _>>()?;
        drop(resources);

        Ok(self.caches.insert(executable.id(), InjectorCache::new(entries)))
    }

    /// Plan for a single field, built on first request.
    pub(crate) fn field_cache(&self, field: &FieldDescriptor) -> Result<Arc<InjectorCache>, InjectErrorKind> {
        if let Some(cache) = self.caches.get(field.id()) {
            debug!(field = field.property().name(), "Plan found in cache");
            return Ok(cache);
        }
        debug!(field = field.property().name(), "Plan not found in cache");

        let entry = Self::entry(&self.resources.read(), field.property(), Origin::Property)?;
        Ok(self.caches.insert(field.id(), InjectorCache::new(Vec::from([entry]))))
    }

    /// Plan for a standalone property. Never cached.
    pub(crate) fn property_cache(&self, property: &Property) -> Result<InjectorCache, InjectErrorKind> {
        let entry = Self::entry(&self.resources.read(), property, Origin::Property)?;
        Ok(InjectorCache::new(Vec::from([entry])))
    }

    fn entry(resources: &Resources, property: &Property, origin: Origin<'_>) -> Result<CacheEntry, InjectErrorKind> {
        let (bind, tag) = Self::fetch_bind(resources, property, origin)?;
        Ok(CacheEntry {
            property: property.clone(),
            tag,
            bind,
            handlers: resources.get_handlers(property),
        })
    }

    /// Picks the bind of the first injectable tag that has one, then the bind of the declared type,
    /// then auto-construction if the property asks for it.
    fn fetch_bind(resources: &Resources, property: &Property, origin: Origin<'_>) -> Result<(Bind, Option<TagInstance>), InjectErrorKind> {
        for tag in property.injectable_tags() {
            if let Some(bind) = resources.get_bind(BindKey::Tag(tag.info().type_info)) {
                debug!(property = %property, tag = tag.info().type_info.name, "Bind matched by tag");
                return Ok((bind, Some(tag.clone())));
            }
        }

        let tag = property.injectable_tags().next().cloned();
        if let Some(bind) = resources.get_bind(BindKey::Type(property.type_info())) {
            debug!(property = %property, "Bind matched by type");
            return Ok((bind, tag));
        }

        if let Some(constructor) = property.auto_constructor() {
            debug!(property = %property, "Bind falls back to auto-construction");
            return Ok((Bind::auto_construct(property, constructor), tag));
        }

        let index = match property.kind() {
            PropertyKind::Parameter { index } => index,
            PropertyKind::Field { .. } => 0,
        };
        let err = InjectErrorKind::MissingBind {
            parameter: property.to_string(),
            executable: origin.describe(property),
            index,
        };
        error!("{}", err);
        Err(err)
    }

    /// Resolves every value of the plan, in parameter order.
    pub(crate) fn resolve_values(&self, injector: &Injector, cache: &InjectorCache, args: &[Value]) -> Result<Vec<Value>, InjectErrorKind> {
        (0..cache.len())
            .map(|index| self.resolve_one(injector, cache, index, args))
            .collect()
    }

    /// Asks the bind at `index` for a raw value and pipes it through the matched handlers.
    pub(crate) fn resolve_one(
        &self,
        injector: &Injector,
        cache: &InjectorCache,
        index: usize,
        args: &[Value],
    ) -> Result<Value, InjectErrorKind> {
        let property = &cache.properties[index];

        let mut value = cache.binds[index]
            .value(injector, property, cache.tags[index].as_ref(), args)
            .inspect_err(|err| error!("{}", err))?;
        for handler in cache.handlers[index].iter() {
            value = match handler.process(property, value, args) {
                Ok(value) => value,
                Err(source) => {
                    let err = InjectErrorKind::Resolve {
                        target: property.to_string(),
                        source,
                    };
                    error!("{}", err);
                    return Err(err);
                }
            };
        }
        Ok(value)
    }
}

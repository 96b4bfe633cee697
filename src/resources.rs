use alloc::{
    collections::{BTreeMap, BTreeSet},
    sync::Arc,
    vec::Vec,
};
use core::any::type_name;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    any::{TypeInfo, Value},
    bind::{Bind, BindKey},
    errors::{ConfigErrorKind, ValueErrorKind},
    handler::{BindHandler, HandlerRecord},
    property::Property,
    tag::{validate_tag, Tag, TagInfo, TagInstance},
};

/// Registry of binds and handlers an injector resolves against.
///
/// A forked registry keeps a live reference to its parent: lookups that find nothing locally fall through to it,
/// writes never reach it.
#[derive(Default)]
pub struct Resources {
    parent: Option<Arc<RwLock<Resources>>>,
    binds: BTreeMap<BindKey, Bind>,
    handlers: BTreeMap<HandlerRecord, BindHandler>,
    supertypes: BTreeMap<TypeInfo, Vec<TypeInfo>>,
}

impl Resources {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty registry falling through to `parent`.
    #[inline]
    #[must_use]
    pub fn fork(parent: &Arc<RwLock<Resources>>) -> Self {
        Self {
            parent: Some(parent.clone()),
            ..Self::default()
        }
    }

    /// Flat copy of the local binds, handlers and supertype declarations, without a parent.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        Self {
            parent: None,
            binds: self.binds.clone(),
            handlers: self.handlers.clone(),
            supertypes: self.supertypes.clone(),
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<&Arc<RwLock<Resources>>> {
        self.parent.as_ref()
    }

    /// Registers a fresh bind for type `T`, replacing the previous one.
    pub fn on<T: ?Sized + 'static>(&mut self) -> &mut Bind {
        self.with(BindKey::Type(TypeInfo::of::<T>()))
    }

    /// Registers a fresh bind for tag class `A`, replacing the previous one.
    ///
    /// # Errors
    /// Returns [`ConfigErrorKind`] if `A` can't be used as a key.
    pub fn on_tag<A: Tag>(&mut self) -> Result<&mut Bind, ConfigErrorKind> {
        let info = validate_tag::<A>()?;
        Ok(self.with(BindKey::Tag(info.type_info)))
    }

    fn with(&mut self, key: BindKey) -> &mut Bind {
        debug!(key = key.type_info().name, "Bind registered");
        let bind = self.binds.entry(key).or_insert_with(|| Bind::new(key));
        *bind = Bind::new(key);
        bind
    }

    /// Declares `Sub` as a subtype of `Super`, so binds for `Super` can serve requests for `Sub`.
    pub fn declare_supertype<Sub: ?Sized + 'static, Super: ?Sized + 'static>(&mut self) {
        self.supertypes
            .entry(TypeInfo::of::<Sub>())
            .or_default()
            .push(TypeInfo::of::<Super>());
    }

    /// Handler applied to every property of type `V`.
    pub fn add_type_handler<V, R>(&mut self, handler: impl Fn(&Property, &V, &[Value]) -> anyhow::Result<R> + Send + Sync + 'static)
    where
        V: Send + Sync + 'static,
        R: Send + Sync + 'static,
    {
        let transform = move |property: &Property, _: Option<&TagInstance>, value: Value, args: &[Value]| {
            let current = downcast_value::<V>(&value)?;
            handler(property, current, args).map(Value::new)
        };
        self.handlers.insert(
            HandlerRecord::of_type(TypeInfo::of::<V>()),
            BindHandler::new(None, transform),
        );
    }

    /// Handler applied to every property tagged with `A`, whatever its type.
    ///
    /// # Errors
    /// Returns [`ConfigErrorKind`] if `A` can't be used as a key.
    pub fn add_tag_handler<A, V, R>(
        &mut self,
        handler: impl Fn(&A, &Property, &V, &[Value]) -> anyhow::Result<R> + Send + Sync + 'static,
    ) -> Result<(), ConfigErrorKind>
    where
        A: Tag,
        V: Send + Sync + 'static,
        R: Send + Sync + 'static,
    {
        let info = validate_tag::<A>()?;
        self.handlers
            .insert(HandlerRecord::of_tag(info.type_info), tagged_handler(info, handler));
        Ok(())
    }

    /// Handler applied to properties of type `V` tagged with `A`.
    ///
    /// # Errors
    /// Returns [`ConfigErrorKind`] if `A` can't be used as a key.
    pub fn add_type_and_tag_handler<A, V, R>(
        &mut self,
        handler: impl Fn(&A, &Property, &V, &[Value]) -> anyhow::Result<R> + Send + Sync + 'static,
    ) -> Result<(), ConfigErrorKind>
    where
        A: Tag,
        V: Send + Sync + 'static,
        R: Send + Sync + 'static,
    {
        let info = validate_tag::<A>()?;
        self.handlers.insert(
            HandlerRecord::of_type_and_tag(TypeInfo::of::<V>(), info.type_info),
            tagged_handler(info, handler),
        );
        Ok(())
    }

    /// Finds the bind serving `requested`.
    ///
    /// Lookup order, per registry level:
    /// 1. the bind registered for exactly this key
    /// 2. for type keys, the bind of the most specific declared supertype, if exactly one is more specific than the rest
    /// 3. for type keys, the bind of a declared subtype, if it's the only one
    ///
    /// and then the parent registry.
    #[must_use]
    pub fn get_bind(&self, requested: BindKey) -> Option<Bind> {
        if let Some(bind) = self.binds.get(&requested) {
            return Some(bind.clone());
        }
        if let BindKey::Type(requested) = requested {
            if let Some(bind) = self.most_related(requested).or_else(|| self.single_subtype(requested)) {
                return Some(bind.clone());
            }
        }
        self.parent.as_ref().and_then(|parent| parent.read().get_bind(requested))
    }

    /// Handlers matching `property`: the type handler first, then for every attached tag
    /// the type handler again, the type-and-tag handler and the tag handler.
    #[must_use]
    pub fn get_handlers(&self, property: &Property) -> Vec<BindHandler> {
        let type_info = property.type_info();

        let mut matched = Vec::new();
        self.push_handler(&mut matched, HandlerRecord::of_type(type_info));
        for tag in property.tags() {
            let tag = tag.info().type_info;
            self.push_handler(&mut matched, HandlerRecord::of_type(type_info));
            self.push_handler(&mut matched, HandlerRecord::of_type_and_tag(type_info, tag));
            self.push_handler(&mut matched, HandlerRecord::of_tag(tag));
        }
        matched
    }

    fn push_handler(&self, matched: &mut Vec<BindHandler>, record: HandlerRecord) {
        if let Some(handler) = self.get_handler(record) {
            matched.push(handler);
        }
    }

    fn get_handler(&self, record: HandlerRecord) -> Option<BindHandler> {
        if let Some(handler) = self.handlers.get(&record) {
            return Some(handler.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.read().get_handler(record))
    }

    /// Supertypes declared for `type_info` in this registry and its ancestors.
    fn direct_supertypes(&self, type_info: TypeInfo) -> Vec<TypeInfo> {
        let mut supertypes = self.supertypes.get(&type_info).cloned().unwrap_or_default();
        if let Some(parent) = &self.parent {
            supertypes.extend(parent.read().direct_supertypes(type_info));
        }
        supertypes
    }

    /// The bound supertype of `requested` that is a subtype of every other bound supertype.
    fn most_related(&self, requested: TypeInfo) -> Option<&Bind> {
        let mut visited = BTreeSet::from([requested]);
        let mut stack = Vec::from([requested]);
        let mut candidates = Vec::new();

        while let Some(type_info) = stack.pop() {
            for supertype in self.direct_supertypes(type_info) {
                if !visited.insert(supertype) {
                    continue;
                }
                if let Some(bind) = self.binds.get(&BindKey::Type(supertype)) {
                    candidates.push((supertype, bind));
                }
                stack.push(supertype);
            }
        }

        let mut specific = candidates.iter().filter(|(candidate, _)| {
            !candidates
                .iter()
                .any(|(other, _)| other != candidate && self.is_subtype(*other, *candidate))
        });
        match (specific.next(), specific.next()) {
            (Some((_, bind)), None) => Some(*bind),
            _ => None,
        }
    }

    fn single_subtype(&self, requested: TypeInfo) -> Option<&Bind> {
        let mut candidates = self.binds.iter().filter_map(|(key, bind)| match key {
            BindKey::Type(type_info) if self.is_subtype(*type_info, requested) => Some(bind),
            _ => None,
        });
        match (candidates.next(), candidates.next()) {
            (Some(bind), None) => Some(bind),
            _ => None,
        }
    }

    fn is_subtype(&self, sub: TypeInfo, target: TypeInfo) -> bool {
        let mut visited = BTreeSet::from([sub]);
        let mut stack = Vec::from([sub]);

        while let Some(type_info) = stack.pop() {
            for supertype in self.direct_supertypes(type_info) {
                if supertype == target {
                    return true;
                }
                if visited.insert(supertype) {
                    stack.push(supertype);
                }
            }
        }
        false
    }

    /// Local binds, tag keys first.
    pub fn binds(&self) -> impl Iterator<Item = &Bind> {
        self.binds.values()
    }
}

fn downcast_value<V: 'static>(value: &Value) -> Result<&V, ValueErrorKind> {
    value.downcast_ref::<V>().ok_or(ValueErrorKind::IncorrectType {
        expected: type_name::<V>(),
        actual: value.type_info().name,
    })
}

fn tagged_handler<A, V, R>(
    info: TagInfo,
    handler: impl Fn(&A, &Property, &V, &[Value]) -> anyhow::Result<R> + Send + Sync + 'static,
) -> BindHandler
where
    A: Tag,
    V: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    let transform = move |property: &Property, tag: Option<&TagInstance>, value: Value, args: &[Value]| {
        let tag = tag
            .and_then(|tag| tag.downcast_ref::<A>())
            .ok_or_else(|| anyhow::anyhow!("Property `{property}` isn't tagged with `{}`", type_name::<A>()))?;
        let current = downcast_value::<V>(&value)?;
        handler(tag, property, current, args).map(Value::new)
    };
    BindHandler::new(Some(info), transform)
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::Resources;
    use crate::{
        any::{TypeInfo, Value},
        bind::BindKey,
        errors::ConfigErrorKind,
        property::Property,
        tag::{Inject, Tag},
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        sync::Arc,
    };
    use parking_lot::RwLock;
    use tracing_test::traced_test;

    struct Named(&'static str);

    impl Tag for Named {
        const INJECTABLE: bool = true;
    }

    trait Animal {}
    trait Pet {}
    trait Named2 {}
    struct Dog;

    fn type_key<T: ?Sized + 'static>() -> BindKey {
        BindKey::Type(TypeInfo::of::<T>())
    }

    fn get_static<T: Clone + 'static>(resources: &Resources, key: BindKey) -> Option<T> {
        let bind = resources.get_bind(key)?;
        let injector = crate::Injector::default();
        bind.value(&injector, &Property::parameter::<()>("value"), None, &[])
            .ok()?
            .get()
            .ok()
    }

    #[test]
    #[traced_test]
    fn test_rebind_overwrites() {
        let mut resources = Resources::new();
        resources.on::<i32>().assign_instance(1);
        resources.on::<i32>().assign_instance(2);

        assert_eq!(get_static::<i32>(&resources, type_key::<i32>()), Some(2));
        assert_eq!(resources.binds().count(), 1);
    }

    #[test]
    #[traced_test]
    fn test_on_tag_validates() {
        let mut resources = Resources::new();

        assert!(resources.on_tag::<Named>().is_ok());
        assert!(matches!(resources.on_tag::<Inject>(), Err(ConfigErrorKind::TagNotInjectable { .. })));

        resources.on::<u8>().assign_instance(1u8);
        let keys: alloc::vec::Vec<_> = resources.binds().map(|bind| bind.associated_key()).collect();
        assert!(matches!(keys[0], BindKey::Tag(_)));
    }

    #[test]
    #[traced_test]
    fn test_supertype_lookup() {
        let mut resources = Resources::new();
        resources.declare_supertype::<Dog, dyn Pet>();
        resources.declare_supertype::<dyn Pet, dyn Animal>();
        resources.on::<dyn Animal>().assign_instance("animal");

        assert_eq!(get_static::<&str>(&resources, type_key::<Dog>()), Some("animal"));

        resources.on::<dyn Pet>().assign_instance("pet");
        assert_eq!(get_static::<&str>(&resources, type_key::<Dog>()), Some("pet"));
    }

    #[test]
    #[traced_test]
    fn test_supertype_lookup_prefers_most_specific_in_diamond() {
        let mut resources = Resources::new();
        resources.declare_supertype::<Dog, dyn Pet>();
        resources.declare_supertype::<dyn Pet, dyn Animal>();
        resources.declare_supertype::<Dog, dyn Animal>();
        resources.on::<dyn Animal>().assign_instance("animal");
        resources.on::<dyn Pet>().assign_instance("pet");

        assert_eq!(get_static::<&str>(&resources, type_key::<Dog>()), Some("pet"));
    }

    #[test]
    #[traced_test]
    fn test_supertype_tie_falls_back_to_single_subtype() {
        let mut resources = Resources::new();
        resources.declare_supertype::<Dog, dyn Pet>();
        resources.declare_supertype::<Dog, dyn Named2>();
        resources.on::<dyn Pet>().assign_instance("pet");
        resources.on::<dyn Named2>().assign_instance("named");

        assert!(resources.get_bind(type_key::<Dog>()).is_none());

        resources.on::<Dog>().assign_instance("dog");
        resources.declare_supertype::<u8, dyn Animal>();
        assert_eq!(get_static::<&str>(&resources, type_key::<dyn Pet>()), Some("pet"));
        assert_eq!(get_static::<&str>(&resources, type_key::<dyn Animal>()), None);

        let mut resources = Resources::new();
        resources.declare_supertype::<Dog, dyn Pet>();
        resources.on::<Dog>().assign_instance("dog");
        assert_eq!(get_static::<&str>(&resources, type_key::<dyn Pet>()), Some("dog"));
    }

    #[test]
    #[traced_test]
    fn test_fork_and_duplicate() {
        let parent = Arc::new(RwLock::new(Resources::new()));
        parent.write().on::<i32>().assign_instance(1);

        let mut fork = Resources::fork(&parent);
        fork.on::<String>().assign_instance("fork".to_string());

        assert_eq!(get_static::<i32>(&fork, type_key::<i32>()), Some(1));
        assert!(parent.read().get_bind(type_key::<String>()).is_none());

        parent.write().on::<u64>().assign_instance(7u64);
        assert_eq!(get_static::<u64>(&fork, type_key::<u64>()), Some(7));

        fork.on::<i32>().assign_instance(2);
        assert_eq!(get_static::<i32>(&fork, type_key::<i32>()), Some(2));
        assert_eq!(get_static::<i32>(&parent.read(), type_key::<i32>()), Some(1));

        let duplicate = fork.duplicate();
        assert!(duplicate.parent().is_none());
        assert_eq!(get_static::<i32>(&duplicate, type_key::<i32>()), Some(2));
        assert!(duplicate.get_bind(type_key::<u64>()).is_none());
    }

    #[test]
    #[traced_test]
    fn test_handler_precedence() {
        let mut resources = Resources::new();
        resources.add_type_handler(|_, value: &String, _| Ok(format!("{value}+type")));
        resources
            .add_type_and_tag_handler(|tag: &Named, _, value: &String, _| Ok(format!("{value}+{}", tag.0)))
            .unwrap();
        resources
            .add_tag_handler(|_: &Named, _, value: &String, _| Ok(format!("{value}+tag")))
            .unwrap();

        let property = Property::parameter::<String>("text").with_tag(Named("both"));
        let handlers = resources.get_handlers(&property);
        assert_eq!(handlers.len(), 4);

        let value = handlers.iter().try_fold(Value::new(String::from("raw")), |value, handler| {
            handler.process(&property, value, &[])
        });
        assert_eq!(value.unwrap().get::<String>().unwrap(), "raw+type+type+both+tag");

        let untagged = Property::parameter::<String>("text");
        assert_eq!(resources.get_handlers(&untagged).len(), 1);
    }

    #[test]
    #[traced_test]
    fn test_handlers_fall_through_to_parent() {
        let parent = Arc::new(RwLock::new(Resources::new()));
        parent
            .write()
            .add_type_handler(|_, value: &i32, _| Ok(value + 1));

        let fork = Resources::fork(&parent);
        let property = Property::parameter::<i32>("number");
        assert_eq!(fork.get_handlers(&property).len(), 1);

        assert!(matches!(
            Resources::new().add_tag_handler(|_: &Inject, _, value: &i32, _| Ok(*value)),
            Err(ConfigErrorKind::TagNotInjectable { .. })
        ));
    }
}

use alloc::vec::Vec;
use core::fmt::{self, Display, Formatter};

use crate::{
    any::{TypeInfo, Value},
    class::Component,
    errors::InjectErrorKind,
    injector::Injector,
    tag::{AutoConstruct, Retention, Tag, TagInstance},
};

pub(crate) type AutoConstructor = fn(&Injector, &[Value]) -> Result<Value, InjectErrorKind>;

fn auto_construct<T: Component>(injector: &Injector, args: &[Value]) -> Result<Value, InjectErrorKind> {
    injector.new_instance_with_fields::<T>(args).map(Value::new)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Field { declaring: TypeInfo },
    Parameter { index: usize },
}

/// An injectable slot: a field or an executable parameter.
#[derive(Clone)]
pub struct Property {
    name: &'static str,
    type_info: TypeInfo,
    tags: Vec<TagInstance>,
    kind: PropertyKind,
    auto_constructor: Option<AutoConstructor>,
}

impl Property {
    /// Parameter of type `T`. The position is assigned when the parameter is added to an executable.
    #[inline]
    #[must_use]
    pub fn parameter<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::new(name, TypeInfo::of::<T>(), PropertyKind::Parameter { index: 0 })
    }

    /// Parameter constructed recursively (with fields) if no bind exists for `T`.
    #[inline]
    #[must_use]
    pub fn auto_parameter<T: Component>(name: &'static str) -> Self {
        Self::parameter::<T>(name).auto_constructed::<T>()
    }

    #[inline]
    #[must_use]
    pub(crate) fn field<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::new(
            name,
            TypeInfo::of::<T>(),
            PropertyKind::Field {
                declaring: TypeInfo::of::<()>(),
            },
        )
    }

    fn new(name: &'static str, type_info: TypeInfo, kind: PropertyKind) -> Self {
        Self {
            name,
            type_info,
            tags: Vec::new(),
            kind,
            auto_constructor: None,
        }
    }

    /// Attaches a tag. Tags that aren't retained at runtime are dropped.
    #[must_use]
    pub fn with_tag<A: Tag>(mut self, tag: A) -> Self {
        if A::RETENTION == Retention::Runtime {
            self.tags.push(TagInstance::new(tag));
        }
        self
    }

    #[must_use]
    pub(crate) fn auto_constructed<T: Component>(mut self) -> Self {
        self.auto_constructor = Some(auto_construct::<T>);
        self.with_tag(AutoConstruct)
    }

    #[inline]
    pub(crate) fn set_kind(&mut self, kind: PropertyKind) {
        self.kind = kind;
    }

    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// Full type name, generic arguments included.
    #[inline]
    #[must_use]
    pub const fn generic_signature(&self) -> &'static str {
        self.type_info.name
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub fn tags(&self) -> &[TagInstance] {
        &self.tags
    }

    #[must_use]
    pub fn tag<A: Tag>(&self) -> Option<&A> {
        self.tags.iter().find_map(|tag| tag.downcast_ref::<A>())
    }

    #[inline]
    #[must_use]
    pub fn has_tag<A: Tag>(&self) -> bool {
        self.tags.iter().any(TagInstance::is::<A>)
    }

    pub(crate) fn tag_by_type(&self, type_info: &TypeInfo) -> Option<&TagInstance> {
        self.tags.iter().find(|tag| tag.info().type_info == *type_info)
    }

    pub fn injectable_tags(&self) -> impl Iterator<Item = &TagInstance> {
        self.tags.iter().filter(|tag| tag.info().injectable)
    }

    #[inline]
    #[must_use]
    pub fn is_auto_constructed(&self) -> bool {
        self.auto_constructor.is_some()
    }

    #[inline]
    pub(crate) const fn auto_constructor(&self) -> Option<AutoConstructor> {
        self.auto_constructor
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.type_info.short_name(), self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Property, PropertyKind};
    use crate::tag::{AutoConstruct, Inject, Retention, Tag};

    use alloc::string::{String, ToString as _};

    struct Named(&'static str);

    impl Tag for Named {
        const INJECTABLE: bool = true;
    }

    struct Documented;

    impl Tag for Documented {
        const RETENTION: Retention = Retention::Source;
    }

    #[test]
    fn test_parameter_tags() {
        let property = Property::parameter::<String>("text")
            .with_tag(Named("first"))
            .with_tag(Documented)
            .with_tag(Inject);

        assert_eq!(property.tags().len(), 2);
        assert_eq!(property.tag::<Named>().map(|named| named.0), Some("first"));
        assert!(property.has_tag::<Inject>());
        assert!(!property.has_tag::<Documented>());
        assert_eq!(property.injectable_tags().count(), 1);
        assert!(!property.is_auto_constructed());
        assert_eq!(property.kind(), PropertyKind::Parameter { index: 0 });
        assert_eq!(property.to_string(), "String text");
        assert_eq!(property.generic_signature(), "alloc::string::String");
        assert!(!property.has_tag::<AutoConstruct>());
    }
}

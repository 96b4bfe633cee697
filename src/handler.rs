use alloc::sync::Arc;
use core::fmt::{self, Debug, Formatter};

use crate::{
    any::{TypeInfo, Value},
    property::Property,
    tag::{TagInfo, TagInstance},
};

type Transform = Arc<dyn Fn(&Property, Option<&TagInstance>, Value, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Registry key of a handler. At least one of the filters is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct HandlerRecord {
    type_info: Option<TypeInfo>,
    tag: Option<TypeInfo>,
}

impl HandlerRecord {
    #[inline]
    pub(crate) const fn of_type(type_info: TypeInfo) -> Self {
        Self {
            type_info: Some(type_info),
            tag: None,
        }
    }

    #[inline]
    pub(crate) const fn of_tag(tag: TypeInfo) -> Self {
        Self {
            type_info: None,
            tag: Some(tag),
        }
    }

    #[inline]
    pub(crate) const fn of_type_and_tag(type_info: TypeInfo, tag: TypeInfo) -> Self {
        Self {
            type_info: Some(type_info),
            tag: Some(tag),
        }
    }
}

/// Post-processing step applied to a value after its bind produced it.
#[derive(Clone)]
pub struct BindHandler {
    tag: Option<TagInfo>,
    transform: Transform,
}

impl BindHandler {
    pub(crate) fn new(
        tag: Option<TagInfo>,
        transform: impl Fn(&Property, Option<&TagInstance>, Value, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            tag,
            transform: Arc::new(transform),
        }
    }

    /// Tag class the handler filters on, if any.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> Option<&TagInfo> {
        self.tag.as_ref()
    }

    /// Transforms `value`, handing the handler its own matched tag of `property`.
    ///
    /// # Errors
    /// Propagates the failure of the transform.
    pub fn process(&self, property: &Property, value: Value, args: &[Value]) -> anyhow::Result<Value> {
        let tag = self.tag.and_then(|tag| property.tag_by_type(&tag.type_info));
        (self.transform)(property, tag, value, args)
    }
}

impl Debug for BindHandler {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindHandler")
            .field("tag", &self.tag.map(|tag| tag.type_info.name))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::{BindHandler, HandlerRecord};
    use crate::{
        any::{TypeInfo, Value},
        property::Property,
        tag::{Tag, TagInfo},
    };

    use alloc::{format, string::String};

    struct Suffix(&'static str);

    impl Tag for Suffix {
        const INJECTABLE: bool = true;
    }

    #[test]
    fn test_process_receives_own_tag() {
        let handler = BindHandler::new(Some(TagInfo::of::<Suffix>()), |_, tag, value, _| {
            let suffix = tag.and_then(|tag| tag.downcast_ref::<Suffix>()).map_or("", |suffix| suffix.0);
            Ok(Value::new(format!("{}{suffix}", value.get::<String>()?)))
        });
        let property = Property::parameter::<String>("text").with_tag(Suffix("!"));

        let value = handler.process(&property, Value::new(String::from("hi")), &[]).unwrap();
        assert_eq!(value.get::<String>().unwrap(), "hi!");

        let untagged = Property::parameter::<String>("text");
        let value = handler.process(&untagged, Value::new(String::from("hi")), &[]).unwrap();
        assert_eq!(value.get::<String>().unwrap(), "hi");
    }

    #[test]
    fn test_records_differ_by_filter() {
        let ty = TypeInfo::of::<String>();
        let tag = TypeInfo::of::<Suffix>();

        assert_ne!(HandlerRecord::of_type(ty), HandlerRecord::of_type_and_tag(ty, tag));
        assert_ne!(HandlerRecord::of_tag(tag), HandlerRecord::of_type_and_tag(ty, tag));
        assert_eq!(HandlerRecord::of_tag(tag), HandlerRecord::of_tag(tag));
    }
}

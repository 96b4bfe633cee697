use alloc::sync::Arc;
use core::{
    any::Any,
    fmt::{self, Debug, Formatter},
};

use crate::{any::TypeInfo, errors::ConfigErrorKind};

/// Whether an attached tag is observable while resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retention {
    /// Dropped when attached to a member.
    Source,
    Runtime,
}

/// A metadata tag class.
///
/// Tags are attached to parameters, fields and methods. Injectable tags can act as keys for binds and handlers,
/// lifecycle tags ([`Inject`], [`AutoConstruct`], [`PostConstruct`]) only mark members.
///
/// ```rust
/// use bindery::Tag;
///
/// struct Named(&'static str);
///
/// impl Tag for Named {
///     const INJECTABLE: bool = true;
/// }
/// ```
pub trait Tag: Any + Send + Sync {
    const INJECTABLE: bool = false;
    const RETENTION: Retention = Retention::Runtime;
}

/// Marks a field as receiving a registry-resolved value.
#[derive(Debug, Clone, Copy)]
pub struct Inject;

/// Marks a field or parameter that falls back to recursive construction if no bind exists for its type.
#[derive(Debug, Clone, Copy)]
pub struct AutoConstruct;

/// Marks a method to run after construction.
#[derive(Debug, Clone, Copy)]
pub struct PostConstruct;

impl Tag for Inject {}
impl Tag for AutoConstruct {}
impl Tag for PostConstruct {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInfo {
    pub type_info: TypeInfo,
    pub injectable: bool,
    pub retention: Retention,
}

impl TagInfo {
    #[inline]
    #[must_use]
    pub fn of<A: Tag>() -> Self {
        Self {
            type_info: TypeInfo::of::<A>(),
            injectable: A::INJECTABLE,
            retention: A::RETENTION,
        }
    }
}

/// A tag attached to a member.
#[derive(Clone)]
pub struct TagInstance {
    info: TagInfo,
    value: Arc<dyn Any + Send + Sync>,
}

impl TagInstance {
    #[inline]
    #[must_use]
    pub fn new<A: Tag>(tag: A) -> Self {
        Self {
            info: TagInfo::of::<A>(),
            value: Arc::new(tag),
        }
    }

    #[inline]
    #[must_use]
    pub const fn info(&self) -> &TagInfo {
        &self.info
    }

    #[inline]
    #[must_use]
    pub fn is<A: Tag>(&self) -> bool {
        self.info.type_info.is::<A>()
    }

    #[inline]
    #[must_use]
    pub fn downcast_ref<A: Tag>(&self) -> Option<&A> {
        self.value.downcast_ref()
    }
}

impl Debug for TagInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TagInstance").field(&self.info.type_info.name).finish()
    }
}

/// Checks that a tag class may be used as a bind or handler key.
///
/// # Errors
/// - Returns [`ConfigErrorKind::TagNotRetained`] if the tag isn't retained at runtime
/// - Returns [`ConfigErrorKind::TagNotInjectable`] if the tag isn't marked as injectable
pub fn validate_tag<A: Tag>() -> Result<TagInfo, ConfigErrorKind> {
    let info = TagInfo::of::<A>();
    if info.retention != Retention::Runtime {
        return Err(ConfigErrorKind::TagNotRetained {
            tag: info.type_info.name,
        });
    }
    if !info.injectable {
        return Err(ConfigErrorKind::TagNotInjectable {
            tag: info.type_info.name,
        });
    }
    Ok(info)
}

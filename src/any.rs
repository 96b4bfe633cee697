use alloc::sync::Arc;
use core::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    fmt::{self, Debug, Formatter},
};

use crate::errors::ValueErrorKind;

pub(crate) type RcAny = Arc<dyn Any + Send + Sync>;

/// Runtime descriptor of a type, used as a registry key.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn of_val<T>(_val: &T) -> Self
    where
        T: ?Sized + 'static,
    {
        Self::of::<T>()
    }

    /// Name without the module path of the outermost type, e.g. `Vec<i32>` for `alloc::vec::Vec<i32>`.
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let raw = self.name.split_once('<').map_or(self.name, |(raw, _)| raw);
        match raw.rsplit_once("::") {
            Some((path, _)) => &self.name[path.len() + 2..],
            None => self.name,
        }
    }

    #[inline]
    #[must_use]
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

/// A type-erased value produced by a bind or handed to a constructor, method or field.
///
/// Cloning is cheap and shares the underlying value, so a static bind hands out the same instance every time.
#[derive(Clone)]
pub struct Value {
    type_info: TypeInfo,
    inner: RcAny,
}

impl Value {
    #[inline]
    #[must_use]
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            inner: Arc::new(value),
        }
    }

    #[inline]
    #[must_use]
    pub fn from_shared<T: Send + Sync + 'static>(value: Arc<T>) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            inner: value,
        }
    }

    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    #[inline]
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_info.is::<T>()
    }

    #[inline]
    #[must_use]
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.inner.downcast_ref()
    }

    /// Clones the held value out.
    ///
    /// # Errors
    /// Returns [`ValueErrorKind::IncorrectType`] if the value isn't a `T`.
    pub fn get<T: Clone + 'static>(&self) -> Result<T, ValueErrorKind> {
        self.downcast_ref::<T>().cloned().ok_or_else(|| self.incorrect_type::<T>())
    }

    /// Returns a shared handle to the held value.
    ///
    /// # Errors
    /// Returns [`ValueErrorKind::IncorrectType`] if the value isn't a `T`.
    pub fn shared<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ValueErrorKind> {
        match self.inner.clone().downcast::<T>() {
            Ok(value) => Ok(value),
            Err(_) => Err(self.incorrect_type::<T>()),
        }
    }

    /// Takes the held value out, if this is the only handle to it.
    ///
    /// # Errors
    /// Returns [`ValueErrorKind::IncorrectType`] if the value isn't a `T`, or
    /// [`ValueErrorKind::Shared`] if other handles to it are still alive.
    pub fn into_inner<T: Send + Sync + 'static>(self) -> Result<T, ValueErrorKind> {
        let type_name = self.type_info.name;
        let value = self.shared::<T>()?;
        drop(self);
        Arc::try_unwrap(value).map_err(|_| ValueErrorKind::Shared { type_name })
    }

    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn incorrect_type<T: ?Sized + 'static>(&self) -> ValueErrorKind {
        ValueErrorKind::IncorrectType {
            expected: type_name::<T>(),
            actual: self.type_info.name,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value").field("type", &self.type_info.name).finish_non_exhaustive()
    }
}

/// Builds the call-time argument array passed through to binds and handlers.
///
/// ```rust
/// use bindery::{args, Value};
///
/// let args: [Value; 2] = args!["custom argument", 7u8];
/// assert_eq!(args[1].get::<u8>().unwrap(), 7);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        [] as [$crate::Value; 0]
    };
    ($($val:expr),+ $(,)?) => {
        [$($crate::Value::new($val)),+]
    };
}

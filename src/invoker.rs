use alloc::{sync::Arc, vec::Vec};
use core::{any::Any, fmt::Display};

use crate::{
    any::Value,
    class::{Executable, FieldDescriptor, Visibility},
    errors::{ConfigErrorKind, ValueErrorKind},
};

/// Resolved values handed to a constructor or method body, in parameter order.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    #[inline]
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// # Errors
    /// Returns [`ValueErrorKind::OutOfBounds`] if there is no argument at `index`.
    pub fn value(&self, index: usize) -> Result<&Value, ValueErrorKind> {
        self.values.get(index).ok_or(ValueErrorKind::OutOfBounds {
            index,
            len: self.values.len(),
        })
    }

    /// Clones the argument at `index` out.
    ///
    /// # Errors
    /// Returns [`ValueErrorKind`] if there is no argument at `index` or it isn't a `T`.
    pub fn get<T: Clone + 'static>(&self, index: usize) -> Result<T, ValueErrorKind> {
        self.value(index)?.get()
    }

    /// # Errors
    /// Returns [`ValueErrorKind`] if there is no argument at `index` or it isn't a `T`.
    pub fn shared<T: Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, ValueErrorKind> {
        self.value(index)?.shared()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    #[inline]
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Performs the call of a constructor or method once its arguments are resolved.
///
/// `instance` is `None` for constructors and associated functions.
pub trait Invoker: Send + Sync {
    #[allow(clippy::missing_errors_doc)]
    fn invoke(&self, instance: Option<&mut dyn Any>, arguments: Arguments) -> anyhow::Result<Value>;
}

/// Performs the assignment of a resolved value to a field.
pub trait FieldInvoker: Send + Sync {
    #[allow(clippy::missing_errors_doc)]
    fn assign(&self, instance: &mut dyn Any, value: Value) -> anyhow::Result<()>;
}

/// Produces invokers for the members injectors are bound to.
///
/// Injectors only talk to the returned invokers, so a factory can replace the generic path
/// (calling the bodies the members were declared with) by any other strategy with the same semantics.
pub trait InvokerFactory: Send + Sync {
    /// # Errors
    /// Returns [`ConfigErrorKind`] if the strategy can't handle the executable.
    fn executable_invoker(&self, declaring: Visibility, executable: &Executable) -> Result<Arc<dyn Invoker>, ConfigErrorKind>;

    /// # Errors
    /// Returns [`ConfigErrorKind`] if the strategy can't handle the field.
    fn field_invoker(&self, declaring: Visibility, field: &FieldDescriptor) -> Result<Arc<dyn FieldInvoker>, ConfigErrorKind>;
}

/// Calls the bodies members were declared with.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericInvokerFactory;

impl InvokerFactory for GenericInvokerFactory {
    #[inline]
    fn executable_invoker(&self, _declaring: Visibility, executable: &Executable) -> Result<Arc<dyn Invoker>, ConfigErrorKind> {
        Ok(executable.body().clone())
    }

    #[inline]
    fn field_invoker(&self, _declaring: Visibility, field: &FieldDescriptor) -> Result<Arc<dyn FieldInvoker>, ConfigErrorKind> {
        Ok(field.setter().clone())
    }
}

/// Setup-time check for strategies that can only reach public members of public types.
///
/// # Errors
/// Returns [`ConfigErrorKind::NotPublic`] if either the declaring type or the member isn't public.
pub fn ensure_public(declaring: Visibility, member: Visibility, target: impl Display) -> Result<(), ConfigErrorKind> {
    use alloc::string::ToString as _;

    if declaring == Visibility::Public && member == Visibility::Public {
        return Ok(());
    }
    Err(ConfigErrorKind::NotPublic {
        target: target.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{ensure_public, Arguments};
    use crate::{any::Value, class::Visibility, errors::ConfigErrorKind, errors::ValueErrorKind};

    use alloc::{string::String, vec};

    #[test]
    fn test_arguments_access() {
        let arguments = Arguments::new(vec![Value::new(1i32), Value::new(String::from("text"))]);

        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments.get::<i32>(0).unwrap(), 1);
        assert_eq!(*arguments.shared::<String>(1).unwrap(), "text");
        assert!(matches!(
            arguments.get::<i32>(2),
            Err(ValueErrorKind::OutOfBounds { index: 2, len: 2 })
        ));
        assert!(matches!(arguments.get::<u8>(0), Err(ValueErrorKind::IncorrectType { .. })));

        let values = arguments.into_values();
        assert_eq!(values.len(), 2);
        assert!(values[1].is::<String>());
    }

    #[test]
    fn test_ensure_public() {
        assert!(ensure_public(Visibility::Public, Visibility::Public, "Service::new").is_ok());
        assert!(matches!(
            ensure_public(Visibility::Private, Visibility::Public, "Service::new"),
            Err(ConfigErrorKind::NotPublic { target }) if target == "Service::new"
        ));
        assert!(ensure_public(Visibility::Public, Visibility::Private, "Service::new").is_err());
    }
}

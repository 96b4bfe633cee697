use alloc::{format, sync::Arc, vec::Vec};
use tracing::error;

use super::ConstructorInjector;
use crate::{
    any::Value,
    class::{Component, Field},
    errors::{ConfigErrorKind, InjectErrorKind},
    invoker::FieldInvoker,
    property::PropertyKind,
};

/// Creates instances of `T` through its constructor, then assigns every injectable field of its hierarchy.
pub struct FieldsInjector<T> {
    constructor: ConstructorInjector<T>,
    fields: Vec<(Field<T>, Arc<dyn FieldInvoker>)>,
}

impl<T: Component> FieldsInjector<T> {
    pub(crate) fn new(constructor: ConstructorInjector<T>) -> Result<Self, InjectErrorKind> {
        let injector = &constructor.injector;
        let factory = injector.invoker_factory();
        let fields = injector
            .classes()
            .injectable_fields::<T>()
            .iter()
            .map(|(field, declaring)| Ok((field.clone(), factory.field_invoker(*declaring, field.descriptor())?)))
            .collect::<Result<Vec<_>, ConfigErrorKind>>()?;

        Ok(Self { constructor, fields })
    }

    #[inline]
    #[must_use]
    pub fn constructor(&self) -> &ConstructorInjector<T> {
        &self.constructor
    }

    /// Constructs an instance, then resolves and assigns its fields in hierarchy order.
    /// The first failing field aborts the remaining assignments.
    ///
    /// # Errors
    /// - Returns [`InjectErrorKind::Resolve`] or [`InjectErrorKind::MissingBind`] if a value can't be resolved
    /// - Returns [`InjectErrorKind::Invoke`] if the constructor or a field setter fails
    pub fn new_instance(&self, args: &[Value]) -> Result<T, InjectErrorKind> {
        let injector = &self.constructor.injector;
        let processor = injector.processor();

        let mut instance = self.constructor.new_instance(args)?;
        for (field, invoker) in &self.fields {
            let descriptor = field.descriptor();
            let cache = processor.field_cache(descriptor)?;
            let value = processor.resolve_one(injector, &cache, 0, args)?;

            if let Err(source) = invoker.assign(&mut instance, value) {
                let property = descriptor.property();
                let target = match property.kind() {
                    PropertyKind::Field { declaring } => format!("{}#{}", declaring.short_name(), property.name()),
                    PropertyKind::Parameter { .. } => format!("{property}"),
                };
                let err = InjectErrorKind::Invoke { target, source };
                error!("{}", err);
                return Err(err);
            }
        }
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use crate::{
        any::Value,
        class::{Class, Component, Constructor, Field},
        errors::InjectErrorKind,
        injector::Injector,
        tag::Inject,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
        vec::Vec,
    };
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Base {
        id: u32,
    }

    impl Component for Base {
        fn class() -> Class<Self> {
            Class::new().field(
                Field::new::<u32>("id", |base: &mut Base, value| {
                    base.id = value.get()?;
                    Ok(())
                })
                .tag(Inject),
            )
        }
    }

    #[derive(Default)]
    struct Derived {
        base: Base,
        name: String,
        order: Vec<&'static str>,
        skipped: Option<u8>,
    }

    impl Component for Derived {
        fn class() -> Class<Self> {
            Class::new()
                .constructor(Constructor::new(|_| Ok(Derived::default())))
                .field(
                    Field::new::<String>("name", |derived: &mut Derived, value| {
                        derived.name = value.get()?;
                        derived.order.push("name");
                        Ok(())
                    })
                    .tag(Inject),
                )
                .field(Field::new::<u8>("skipped", |derived: &mut Derived, value: Value| {
                    derived.skipped = Some(value.get()?);
                    Ok(())
                }))
                .extends(|derived: &mut Derived| &mut derived.base)
        }
    }

    #[test]
    #[traced_test]
    fn test_fields_across_hierarchy() {
        let injector = Injector::new(|resources| {
            resources.on::<u32>().assign_instance(42u32);
            resources.on::<String>().assign_instance("derived".to_string());
            resources.on::<u8>().assign_instance(1u8);
        });

        let derived = injector.for_fields::<Derived>().unwrap().new_instance(&[]).unwrap();
        assert_eq!(derived.name, "derived");
        assert_eq!(derived.base.id, 42);
        assert_eq!(derived.order, ["name"]);
        assert_eq!(derived.skipped, None);
    }

    #[test]
    #[traced_test]
    fn test_setter_failure_aborts() {
        let injector = Injector::new(|resources| {
            resources.on::<u32>().assign_instance(42u32);
            resources.on::<String>().assign_instance(5i64);
        });

        let err = injector.new_instance_with_fields::<Derived>(&[]).err().unwrap();
        assert!(matches!(err, InjectErrorKind::Invoke { ref target, .. } if target == "Derived#name"));
    }
}

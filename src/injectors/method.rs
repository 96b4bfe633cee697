use alloc::{sync::Arc, vec::Vec};
use core::any::Any;
use tracing::error;

use crate::{
    any::Value,
    cache::InjectorCache,
    class::{Method, Visibility},
    errors::InjectErrorKind,
    injector::Injector,
    invoker::{Arguments, Invoker},
};

/// Invokes one method, resolving its parameters on every call.
pub struct MethodInjector<T> {
    injector: Injector,
    method: Method<T>,
    invoker: Arc<dyn Invoker>,
    cache: Arc<InjectorCache>,
}

impl<T: 'static> MethodInjector<T> {
    pub(crate) fn new(injector: Injector, method: Method<T>, declaring: Visibility) -> Result<Self, InjectErrorKind> {
        let invoker = injector.invoker_factory().executable_invoker(declaring, method.executable())?;
        let cache = injector.processor().executable_cache(method.executable())?;

        Ok(Self {
            injector,
            method,
            invoker,
            cache,
        })
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method<T> {
        &self.method
    }

    /// Invokes the method on `instance`. Associated functions ignore it.
    ///
    /// # Errors
    /// - Returns [`InjectErrorKind::Resolve`] or [`InjectErrorKind::MissingBind`] if a parameter can't be resolved
    /// - Returns [`InjectErrorKind::Invoke`] if the method itself fails
    pub fn invoke(&self, instance: Option<&mut T>, args: &[Value]) -> Result<Value, InjectErrorKind> {
        let executable = self.method.executable();

        let values = if executable.parameters().is_empty() {
            Vec::new()
        } else {
            self.injector.processor().resolve_values(&self.injector, &self.cache, args)?
        };

        let instance = instance.map(|instance| instance as &mut dyn Any);
        self.invoker.invoke(instance, Arguments::new(values)).map_err(|source| {
            let err = InjectErrorKind::Invoke {
                target: executable.signature(),
                source,
            };
            error!("{}", err);
            err
        })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use crate::{
        class::{Class, Component, Method},
        errors::InjectErrorKind,
        injector::Injector,
        property::Property,
    };

    use alloc::{
        format,
        string::{String, ToString as _},
    };
    use tracing_test::traced_test;

    #[derive(Default)]
    struct Counter {
        total: u32,
    }

    impl Component for Counter {
        fn class() -> Class<Self> {
            Class::new()
        }
    }

    #[test]
    #[traced_test]
    fn test_invoke_with_receiver() {
        let injector = Injector::new(|resources| resources.on::<u32>().assign_instance(5u32));
        let method = Method::<Counter>::new("add", |counter: &mut Counter, args| {
            counter.total += args.get::<u32>(0)?;
            Ok(counter.total)
        })
        .param(Property::parameter::<u32>("amount"));

        let method_injector = injector.for_method(&method).unwrap();
        let mut counter = Counter::default();
        method_injector.invoke(Some(&mut counter), &[]).unwrap();
        let total = method_injector.invoke(Some(&mut counter), &[]).unwrap();

        assert_eq!(total.get::<u32>().unwrap(), 10);
        assert_eq!(counter.total, 10);
    }

    #[test]
    #[traced_test]
    fn test_errors_kept_apart() {
        let injector = Injector::new(|resources| {
            resources
                .on::<String>()
                .assign_throwing_supplier::<String>(|| Err(anyhow::anyhow!("no text")));
        });

        let failing_body = Method::<Counter>::associated("fail", |_| -> anyhow::Result<()> { Err(anyhow::anyhow!("body")) });
        let err = injector.invoke_method(&failing_body, None, &[]).unwrap_err();
        assert!(matches!(err, InjectErrorKind::Invoke { ref target, .. } if target == "Counter#fail()"));

        let failing_param = Method::<Counter>::associated("echo", |args| Ok(args.get::<String>(0)?))
            .param(Property::parameter::<String>("text"));
        let err = injector.invoke_method(&failing_param, None, &[]).unwrap_err();
        assert!(matches!(err, InjectErrorKind::Resolve { ref target, .. } if target == "String text"));

        let needs_receiver = Method::<Counter>::new("touch", |_: &mut Counter, _| Ok(()));
        let err = injector.invoke_method(&needs_receiver, None, &[]).unwrap_err();
        assert!(matches!(err, InjectErrorKind::Invoke { .. }));
    }
}

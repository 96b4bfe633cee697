use alloc::{sync::Arc, vec::Vec};
use tracing::error;

use crate::{
    any::Value,
    cache::InjectorCache,
    class::{Component, Constructor},
    errors::InjectErrorKind,
    injector::Injector,
    invoker::{Arguments, Invoker},
};

/// Creates instances of `T` through one constructor, resolving its parameters on every call.
pub struct ConstructorInjector<T> {
    pub(crate) injector: Injector,
    constructor: Constructor<T>,
    invoker: Arc<dyn Invoker>,
    cache: Arc<InjectorCache>,
}

impl<T: Component> ConstructorInjector<T> {
    pub(crate) fn new(injector: Injector, constructor: Constructor<T>) -> Result<Self, InjectErrorKind> {
        let class = injector.classes().class::<T>();
        let invoker = injector
            .invoker_factory()
            .executable_invoker(class.visibility(), constructor.executable())?;
        let cache = injector.processor().executable_cache(constructor.executable())?;

        Ok(Self {
            injector,
            constructor,
            invoker,
            cache,
        })
    }

    #[inline]
    #[must_use]
    pub fn constructor(&self) -> &Constructor<T> {
        &self.constructor
    }

    /// # Errors
    /// - Returns [`InjectErrorKind::Resolve`] or [`InjectErrorKind::MissingBind`] if a parameter can't be resolved
    /// - Returns [`InjectErrorKind::Invoke`] if the constructor itself fails
    pub fn new_instance(&self, args: &[Value]) -> Result<T, InjectErrorKind> {
        let executable = self.constructor.executable();

        let values = if executable.parameters().is_empty() {
            Vec::new()
        } else {
            self.injector.processor().resolve_values(&self.injector, &self.cache, args)?
        };

        match self.invoker.invoke(None, Arguments::new(values)) {
            Ok(instance) => Ok(instance.into_inner()?),
            Err(source) => {
                let err = InjectErrorKind::Invoke {
                    target: executable.signature(),
                    source,
                };
                error!("{}", err);
                Err(err)
            }
        }
    }
}

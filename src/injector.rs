use alloc::sync::Arc;
use core::any::type_name;
use parking_lot::RwLock;
use tracing::{debug, error, info_span};

use crate::{
    any::Value,
    class::{Component, Constructor, Method},
    class_cache::ClassCache,
    errors::{ConfigErrorKind, InjectErrorKind},
    injectors::{ConstructorInjector, FieldsInjector, MethodInjector},
    invoker::{GenericInvokerFactory, InvokerFactory},
    processor::InjectorProcessor,
    property::Property,
    resources::Resources,
    tag::{PostConstruct, Tag},
};

/// Entry point: creates injectors over a registry and runs construction with lifecycle hooks.
///
/// Cloning is cheap and shares the registry and every cache.
///
/// ```rust
/// use bindery::{Class, Component, Constructor, Injector, Property};
///
/// struct Greeting(String);
///
/// impl Component for Greeting {
///     fn class() -> Class<Self> {
///         Class::new().constructor(
///             Constructor::new(|args| Ok(Greeting(args.get(0)?))).param(Property::parameter::<String>("text")),
///         )
///     }
/// }
///
/// let injector = Injector::new(|resources| {
///     resources.on::<String>().assign_instance(String::from("hello"));
/// });
/// let greeting = injector.new_instance::<Greeting>(&[]).unwrap();
/// assert_eq!(greeting.0, "hello");
/// ```
#[derive(Clone)]
pub struct Injector {
    inner: Arc<InjectorInner>,
}

struct InjectorInner {
    processor: InjectorProcessor,
    classes: ClassCache,
    invoker_factory: Arc<dyn InvokerFactory>,
}

impl Default for Injector {
    fn default() -> Self {
        Self::from_resources(Resources::new())
    }
}

impl Injector {
    /// Creates an injector over a fresh registry configured by `controller`.
    #[must_use]
    pub fn new(controller: impl FnOnce(&mut Resources)) -> Self {
        let mut resources = Resources::new();
        controller(&mut resources);
        Self::from_resources(resources)
    }

    /// Like [`Self::new`], for controllers that can fail.
    ///
    /// # Errors
    /// Returns the error of `controller`.
    pub fn try_new<E>(controller: impl FnOnce(&mut Resources) -> Result<(), E>) -> Result<Self, E> {
        let mut resources = Resources::new();
        controller(&mut resources)?;
        Ok(Self::from_resources(resources))
    }

    #[must_use]
    pub fn from_resources(resources: Resources) -> Self {
        Self::build(Arc::new(RwLock::new(resources)), Arc::new(GenericInvokerFactory))
    }

    fn build(resources: Arc<RwLock<Resources>>, invoker_factory: Arc<dyn InvokerFactory>) -> Self {
        Self {
            inner: Arc::new(InjectorInner {
                processor: InjectorProcessor::new(resources),
                classes: ClassCache::default(),
                invoker_factory,
            }),
        }
    }

    /// Injector over the same registry, producing invokers with `factory`.
    #[must_use]
    pub fn with_invoker_factory(&self, factory: impl InvokerFactory + 'static) -> Self {
        Self::build(self.resources().clone(), Arc::new(factory))
    }

    /// The registry, shared with every clone of this injector and with its forks as their parent.
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &Arc<RwLock<Resources>> {
        self.inner.processor.resources()
    }

    #[inline]
    pub(crate) fn processor(&self) -> &InjectorProcessor {
        &self.inner.processor
    }

    #[inline]
    pub(crate) fn classes(&self) -> &ClassCache {
        &self.inner.classes
    }

    #[inline]
    pub(crate) fn invoker_factory(&self) -> &dyn InvokerFactory {
        &*self.inner.invoker_factory
    }

    /// Injector for the only constructor of `T`.
    ///
    /// # Errors
    /// - Returns [`ConfigErrorKind::ConstructorCount`] if `T` doesn't declare exactly one constructor
    /// - Returns [`InjectErrorKind::MissingBind`] if a parameter has no bind
    pub fn for_constructor<T: Component>(&self) -> Result<ConstructorInjector<T>, InjectErrorKind> {
        let class = self.classes().class::<T>();
        let [constructor] = class.declared_constructors() else {
            let err = InjectErrorKind::from(ConfigErrorKind::ConstructorCount {
                type_name: type_name::<T>(),
                count: class.declared_constructors().len(),
            });
            error!("{}", err);
            return Err(err);
        };
        ConstructorInjector::new(self.clone(), constructor.clone())
    }

    /// Injector for a constructor chosen by the caller.
    ///
    /// # Errors
    /// Returns [`InjectErrorKind::MissingBind`] if a parameter has no bind.
    pub fn for_constructor_with<T: Component>(&self, constructor: &Constructor<T>) -> Result<ConstructorInjector<T>, InjectErrorKind> {
        ConstructorInjector::new(self.clone(), constructor.clone())
    }

    /// # Errors
    /// See [`Self::for_constructor`].
    pub fn for_fields<T: Component>(&self) -> Result<FieldsInjector<T>, InjectErrorKind> {
        FieldsInjector::new(self.for_constructor::<T>()?)
    }

    /// # Errors
    /// Returns [`InjectErrorKind::MissingBind`] if a parameter has no bind.
    pub fn for_method<T: Component>(&self, method: &Method<T>) -> Result<MethodInjector<T>, InjectErrorKind> {
        let class = self.classes().class::<T>();
        let declaring_type = method.executable().declaring();
        let declaring = class
            .hierarchy()
            .find(|class| class.type_info() == declaring_type)
            .unwrap_or(&*class)
            .visibility();
        MethodInjector::new(self.clone(), method.clone(), declaring)
    }

    /// Constructs `T` through its only constructor, then runs its [`PostConstruct`] methods.
    ///
    /// # Errors
    /// Returns [`InjectErrorKind`] if construction or a post-construct method fails.
    pub fn new_instance<T: Component>(&self, args: &[Value]) -> Result<T, InjectErrorKind> {
        let span = info_span!("new_instance", dependency = type_name::<T>());
        let _guard = span.enter();

        let mut instance = self.for_constructor::<T>()?.new_instance(args)?;
        self.post_construct(&mut instance, args)?;
        Ok(instance)
    }

    /// Constructs `T` through `constructor`, then runs its [`PostConstruct`] methods.
    ///
    /// # Errors
    /// Returns [`InjectErrorKind`] if construction or a post-construct method fails.
    pub fn new_instance_with_constructor<T: Component>(&self, constructor: &Constructor<T>, args: &[Value]) -> Result<T, InjectErrorKind> {
        let span = info_span!("new_instance_with_constructor", dependency = type_name::<T>());
        let _guard = span.enter();

        let mut instance = self.for_constructor_with(constructor)?.new_instance(args)?;
        self.post_construct(&mut instance, args)?;
        Ok(instance)
    }

    /// Constructs `T`, assigns its injectable fields, then runs its [`PostConstruct`] methods.
    ///
    /// # Errors
    /// Returns [`InjectErrorKind`] if construction, a field or a post-construct method fails.
    pub fn new_instance_with_fields<T: Component>(&self, args: &[Value]) -> Result<T, InjectErrorKind> {
        let span = info_span!("new_instance_with_fields", dependency = type_name::<T>());
        let _guard = span.enter();

        let mut instance = self.for_fields::<T>()?.new_instance(args)?;
        self.post_construct(&mut instance, args)?;
        Ok(instance)
    }

    fn post_construct<T: Component>(&self, instance: &mut T, args: &[Value]) -> Result<(), InjectErrorKind> {
        self.invoke_annotated_methods::<PostConstruct, T>(instance, args)?;
        debug!("Post-construct methods called");
        Ok(())
    }

    /// # Errors
    /// Returns [`InjectErrorKind`] if a parameter can't be resolved or the method fails.
    pub fn invoke_method<T: Component>(&self, method: &Method<T>, instance: Option<&mut T>, args: &[Value]) -> Result<Value, InjectErrorKind> {
        let span = info_span!("invoke_method", method = method.executable().name(), dependency = type_name::<T>());
        let _guard = span.enter();

        self.for_method(method)?.invoke(instance, args)
    }

    /// Invokes every method of `T`'s hierarchy tagged with `A`, most-derived class first.
    ///
    /// # Errors
    /// Returns the first failure; later methods aren't invoked.
    pub fn invoke_annotated_methods<A: Tag, T: Component>(&self, instance: &mut T, args: &[Value]) -> Result<(), InjectErrorKind> {
        let span = info_span!("invoke_annotated_methods", tag = type_name::<A>(), dependency = type_name::<T>());
        let _guard = span.enter();

        for (method, declaring) in self.classes().annotated_methods::<T, A>().iter() {
            MethodInjector::new(self.clone(), method.clone(), *declaring)?.invoke(Some(&mut *instance), args)?;
        }
        Ok(())
    }

    /// Value that would be injected into `property`. The plan is built anew on every call.
    ///
    /// # Errors
    /// Returns [`InjectErrorKind`] if no bind serves the property or resolving it fails.
    pub fn resolve_property(&self, property: &Property, args: &[Value]) -> Result<Value, InjectErrorKind> {
        let span = info_span!("resolve_property", property = %property);
        let _guard = span.enter();

        let cache = self.processor().property_cache(property)?;
        self.processor().resolve_one(self, &cache, 0, args)
    }

    /// Injector over a registry falling through to this one, configured by `controller`.
    /// Binds added here afterwards stay visible through the fork unless shadowed.
    #[must_use]
    pub fn fork(&self, controller: impl FnOnce(&mut Resources)) -> Self {
        let mut resources = Resources::fork(self.resources());
        controller(&mut resources);
        Self::build(Arc::new(RwLock::new(resources)), self.inner.invoker_factory.clone())
    }

    /// Injector over a flat copy of this registry, configured by `controller`.
    #[must_use]
    pub fn duplicate(&self, controller: impl FnOnce(&mut Resources)) -> Self {
        let mut resources = self.resources().read().duplicate();
        controller(&mut resources);
        Self::build(Arc::new(RwLock::new(resources)), self.inner.invoker_factory.clone())
    }
}

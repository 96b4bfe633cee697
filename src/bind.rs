use alloc::sync::Arc;
use core::fmt::{self, Debug, Formatter};
use parking_lot::Mutex;

use crate::{
    any::{TypeInfo, Value},
    errors::InjectErrorKind,
    injector::Injector,
    property::{AutoConstructor, Property},
    tag::TagInstance,
};

type Supplier = Arc<dyn Fn() -> anyhow::Result<Value> + Send + Sync>;
type Handler = Arc<dyn Fn(&Property, Option<&TagInstance>, &[Value]) -> anyhow::Result<Value> + Send + Sync>;

/// Key a bind is registered under.
///
/// Tag keys sort before type keys. The order only affects iteration over a registry, never lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BindKey {
    Tag(TypeInfo),
    Type(TypeInfo),
}

impl BindKey {
    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        match self {
            Self::Tag(type_info) | Self::Type(type_info) => *type_info,
        }
    }
}

pub(crate) struct Lazy {
    supplier: Supplier,
    value: Mutex<Option<Value>>,
}

impl Lazy {
    /// The supplier runs outside the lock; if two calls race, the first stored value is kept.
    fn get(&self) -> anyhow::Result<Value> {
        if let Some(value) = self.value.lock().as_ref() {
            return Ok(value.clone());
        }
        let value = (self.supplier)()?;
        Ok(self.value.lock().get_or_insert(value).clone())
    }
}

#[derive(Clone)]
pub(crate) enum BindValue {
    Static(Value),
    Supplier(Supplier),
    Lazy(Arc<Lazy>),
    Handled(Handler),
    AutoConstruct(AutoConstructor),
}

/// A strategy producing values for one key.
///
/// Configured with exactly one `assign_*` call; a later call replaces the strategy.
#[derive(Clone)]
pub struct Bind {
    key: BindKey,
    data_type: TypeInfo,
    value: Option<BindValue>,
}

impl Bind {
    #[inline]
    #[must_use]
    pub(crate) const fn new(key: BindKey) -> Self {
        Self {
            key,
            data_type: key.type_info(),
            value: None,
        }
    }

    /// Bind used when a property requests construction of its own type.
    pub(crate) fn auto_construct(property: &Property, constructor: AutoConstructor) -> Self {
        Self {
            key: BindKey::Type(property.type_info()),
            data_type: property.type_info(),
            value: Some(BindValue::AutoConstruct(constructor)),
        }
    }

    /// Hands out the same value on every resolution.
    pub fn assign_instance<T: Send + Sync + 'static>(&mut self, value: T) {
        self.assign_value(Value::new(value));
    }

    /// Hands out an already erased value on every resolution.
    pub fn assign_value(&mut self, value: Value) {
        self.data_type = value.type_info();
        self.value = Some(BindValue::Static(value));
    }

    /// Calls `supplier` on every resolution.
    pub fn assign_supplier<T: Send + Sync + 'static>(&mut self, supplier: impl Fn() -> T + Send + Sync + 'static) {
        self.assign_throwing_supplier(move || Ok(supplier()));
    }

    pub fn assign_throwing_supplier<T: Send + Sync + 'static>(
        &mut self,
        supplier: impl Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    ) {
        self.data_type = TypeInfo::of::<T>();
        self.value = Some(BindValue::Supplier(Arc::new(move || supplier().map(Value::new))));
    }

    /// Calls `supplier` on first resolution and hands out that value afterwards.
    pub fn assign_lazy_instance<T: Send + Sync + 'static>(&mut self, supplier: impl Fn() -> T + Send + Sync + 'static) {
        self.data_type = TypeInfo::of::<T>();
        self.value = Some(BindValue::Lazy(Arc::new(Lazy {
            supplier: Arc::new(move || Ok(Value::new(supplier()))),
            value: Mutex::new(None),
        })));
    }

    /// Computes the value from the requesting property, its matched tag and the call arguments.
    pub fn assign_handler<R: Send + Sync + 'static>(
        &mut self,
        handler: impl Fn(&Property, Option<&TagInstance>, &[Value]) -> R + Send + Sync + 'static,
    ) {
        self.assign_throwing_handler(move |property: &Property, tag: Option<&TagInstance>, args: &[Value]| {
            Ok(handler(property, tag, args))
        });
    }

    pub fn assign_throwing_handler<R: Send + Sync + 'static>(
        &mut self,
        handler: impl Fn(&Property, Option<&TagInstance>, &[Value]) -> anyhow::Result<R> + Send + Sync + 'static,
    ) {
        self.data_type = TypeInfo::of::<R>();
        self.value = Some(BindValue::Handled(Arc::new(
            move |property: &Property, tag: Option<&TagInstance>, args: &[Value]| handler(property, tag, args).map(Value::new),
        )));
    }

    #[inline]
    #[must_use]
    pub const fn associated_key(&self) -> BindKey {
        self.key
    }

    /// Type of the values this bind produces, or the key type while no strategy is assigned.
    #[inline]
    #[must_use]
    pub const fn data_type(&self) -> TypeInfo {
        self.data_type
    }

    #[inline]
    #[must_use]
    pub const fn is_assigned(&self) -> bool {
        self.value.is_some()
    }

    pub(crate) fn value(
        &self,
        injector: &Injector,
        property: &Property,
        tag: Option<&TagInstance>,
        args: &[Value],
    ) -> Result<Value, InjectErrorKind> {
        use alloc::string::ToString as _;

        let resolve_err = |source| InjectErrorKind::Resolve {
            target: property.to_string(),
            source,
        };

        match &self.value {
            Some(BindValue::Static(value)) => Ok(value.clone()),
            Some(BindValue::Supplier(supplier)) => supplier().map_err(resolve_err),
            Some(BindValue::Lazy(lazy)) => lazy.get().map_err(resolve_err),
            Some(BindValue::Handled(handler)) => handler(property, tag, args).map_err(resolve_err),
            Some(BindValue::AutoConstruct(constructor)) => constructor(injector, args),
            None => Err(resolve_err(anyhow::anyhow!(
                "No value assigned to bind for `{}`",
                self.key.type_info().name
            ))),
        }
    }
}

impl Debug for Bind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bind")
            .field("key", &self.key)
            .field("data_type", &self.data_type.name)
            .finish_non_exhaustive()
    }
}

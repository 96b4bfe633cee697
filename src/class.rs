use alloc::{boxed::Box, string::String, sync::Arc, vec::Vec};
use core::{
    any::{type_name, Any},
    fmt::{self, Display, Formatter},
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};

use crate::{
    any::{TypeInfo, Value},
    errors::ValueErrorKind,
    invoker::{Arguments, FieldInvoker, Invoker},
    property::{Property, PropertyKind},
    tag::{AutoConstruct, Inject, Retention, Tag, TagInstance},
};

/// A type the injector can construct.
///
/// The class descriptor lists the constructors, fields and methods the injector may use,
/// and optionally the ancestor whose members the type inherits.
///
/// ```rust
/// use bindery::{Class, Component, Constructor, Property};
///
/// struct Greeter {
///     greeting: String,
/// }
///
/// impl Component for Greeter {
///     fn class() -> Class<Self> {
///         Class::new().constructor(
///             Constructor::new(|args| Ok(Greeter { greeting: args.get(0)? })).param(Property::parameter::<String>("greeting")),
///         )
///     }
/// }
/// ```
pub trait Component: Sized + Send + Sync + 'static {
    fn class() -> Class<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(u64);

impl MemberId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableKind {
    Constructor,
    Method,
}

/// Type-erased description of a constructor or method.
#[derive(Clone)]
pub struct Executable {
    id: MemberId,
    kind: ExecutableKind,
    declaring: TypeInfo,
    name: &'static str,
    visibility: Visibility,
    parameters: Vec<Property>,
    tags: Vec<TagInstance>,
    body: Arc<dyn Invoker>,
}

impl Executable {
    fn new(kind: ExecutableKind, declaring: TypeInfo, name: &'static str, body: Arc<dyn Invoker>) -> Self {
        Self {
            id: MemberId::next(),
            kind,
            declaring,
            name,
            visibility: Visibility::Public,
            parameters: Vec::new(),
            tags: Vec::new(),
            body,
        }
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> MemberId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn kind(&self) -> ExecutableKind {
        self.kind
    }

    #[inline]
    #[must_use]
    pub const fn declaring(&self) -> TypeInfo {
        self.declaring
    }

    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[Property] {
        &self.parameters
    }

    #[inline]
    #[must_use]
    pub fn tags(&self) -> &[TagInstance] {
        &self.tags
    }

    #[inline]
    #[must_use]
    pub fn has_tag<A: Tag>(&self) -> bool {
        self.tags.iter().any(TagInstance::is::<A>)
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> &Arc<dyn Invoker> {
        &self.body
    }

    /// Renders `Type#name(T1 a, T2 b)`.
    #[must_use]
    pub fn signature(&self) -> String {
        use alloc::string::ToString as _;

        self.to_string()
    }

    fn push_parameter(&mut self, mut property: Property) {
        property.set_kind(PropertyKind::Parameter {
            index: self.parameters.len(),
        });
        self.parameters.push(property);
    }

    fn push_tag<A: Tag>(&mut self, tag: A) {
        if A::RETENTION == Retention::Runtime {
            self.tags.push(TagInstance::new(tag));
        }
    }
}

impl Display for Executable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}(", self.declaring.short_name(), self.name)?;
        for (index, parameter) in self.parameters.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{parameter}")?;
        }
        write!(f, ")")
    }
}

/// Gives builders a fresh identity on every edit, so caches never mix two shapes of one member.
fn edit<D: Clone + Identified>(inner: &mut Arc<D>) -> &mut D {
    let inner = Arc::make_mut(inner);
    inner.reassign_id();
    inner
}

trait Identified {
    fn reassign_id(&mut self);
}

impl Identified for Executable {
    fn reassign_id(&mut self) {
        self.id = MemberId::next();
    }
}

struct ConstructorBody<T, F> {
    f: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> Invoker for ConstructorBody<T, F>
where
    T: Send + Sync + 'static,
    F: Fn(Arguments) -> anyhow::Result<T> + Send + Sync,
{
    fn invoke(&self, _instance: Option<&mut dyn Any>, arguments: Arguments) -> anyhow::Result<Value> {
        (self.f)(arguments).map(Value::new)
    }
}

pub struct Constructor<T> {
    inner: Arc<Executable>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Constructor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Send + Sync + 'static> Constructor<T> {
    #[must_use]
    pub fn new(body: impl Fn(Arguments) -> anyhow::Result<T> + Send + Sync + 'static) -> Self {
        let body = Arc::new(ConstructorBody {
            f: body,
            _marker: PhantomData,
        });
        Self {
            inner: Arc::new(Executable::new(ExecutableKind::Constructor, TypeInfo::of::<T>(), "new", body)),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn named(mut self, name: &'static str) -> Self {
        edit(&mut self.inner).name = name;
        self
    }

    #[must_use]
    pub fn param(mut self, property: Property) -> Self {
        edit(&mut self.inner).push_parameter(property);
        self
    }

    #[must_use]
    pub fn tag<A: Tag>(mut self, tag: A) -> Self {
        edit(&mut self.inner).push_tag(tag);
        self
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        edit(&mut self.inner).visibility = Visibility::Private;
        self
    }
}

impl<T> Constructor<T> {
    #[inline]
    #[must_use]
    pub fn executable(&self) -> &Executable {
        &self.inner
    }
}

struct MethodBody<T, R, F> {
    f: F,
    _marker: PhantomData<fn(T) -> R>,
}

impl<T, R, F> Invoker for MethodBody<T, R, F>
where
    T: 'static,
    R: Send + Sync + 'static,
    F: Fn(&mut T, Arguments) -> anyhow::Result<R> + Send + Sync,
{
    fn invoke(&self, instance: Option<&mut dyn Any>, arguments: Arguments) -> anyhow::Result<Value> {
        let this = instance
            .and_then(|instance| instance.downcast_mut::<T>())
            .ok_or(ValueErrorKind::MissingReceiver { expected: type_name::<T>() })?;
        (self.f)(this, arguments).map(Value::new)
    }
}

struct AssociatedBody<R, F> {
    f: F,
    _marker: PhantomData<fn() -> R>,
}

impl<R, F> Invoker for AssociatedBody<R, F>
where
    R: Send + Sync + 'static,
    F: Fn(Arguments) -> anyhow::Result<R> + Send + Sync,
{
    fn invoke(&self, _instance: Option<&mut dyn Any>, arguments: Arguments) -> anyhow::Result<Value> {
        (self.f)(arguments).map(Value::new)
    }
}

pub struct Method<T> {
    inner: Arc<Executable>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Method<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Method<T> {
    /// Method taking the instance as receiver.
    #[must_use]
    pub fn new<R: Send + Sync + 'static>(
        name: &'static str,
        body: impl Fn(&mut T, Arguments) -> anyhow::Result<R> + Send + Sync + 'static,
    ) -> Self {
        let body = Arc::new(MethodBody {
            f: body,
            _marker: PhantomData,
        });
        Self::from_body(name, body)
    }

    /// Function without receiver. Invoked with or without an instance.
    #[must_use]
    pub fn associated<R: Send + Sync + 'static>(
        name: &'static str,
        body: impl Fn(Arguments) -> anyhow::Result<R> + Send + Sync + 'static,
    ) -> Self {
        let body = Arc::new(AssociatedBody {
            f: body,
            _marker: PhantomData,
        });
        Self::from_body(name, body)
    }

    fn from_body(name: &'static str, body: Arc<dyn Invoker>) -> Self {
        Self {
            inner: Arc::new(Executable::new(ExecutableKind::Method, TypeInfo::of::<T>(), name, body)),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn param(mut self, property: Property) -> Self {
        edit(&mut self.inner).push_parameter(property);
        self
    }

    #[must_use]
    pub fn tag<A: Tag>(mut self, tag: A) -> Self {
        edit(&mut self.inner).push_tag(tag);
        self
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        edit(&mut self.inner).visibility = Visibility::Private;
        self
    }
}

impl<T> Method<T> {
    #[inline]
    #[must_use]
    pub fn executable(&self) -> &Executable {
        &self.inner
    }

    #[inline]
    #[must_use]
    pub fn has_tag<A: Tag>(&self) -> bool {
        self.inner.has_tag::<A>()
    }
}

/// Type-erased description of a field.
#[derive(Clone)]
pub struct FieldDescriptor {
    id: MemberId,
    property: Property,
    visibility: Visibility,
    setter: Arc<dyn FieldInvoker>,
}

impl FieldDescriptor {
    #[inline]
    #[must_use]
    pub const fn id(&self) -> MemberId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn property(&self) -> &Property {
        &self.property
    }

    #[inline]
    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    #[must_use]
    pub fn setter(&self) -> &Arc<dyn FieldInvoker> {
        &self.setter
    }

    /// Fields tagged with [`Inject`] or [`AutoConstruct`] receive values during field injection.
    #[inline]
    #[must_use]
    pub fn is_injectable(&self) -> bool {
        self.property.has_tag::<Inject>() || self.property.has_tag::<AutoConstruct>()
    }
}

impl Identified for FieldDescriptor {
    fn reassign_id(&mut self) {
        self.id = MemberId::next();
    }
}

struct FieldSetter<T, F> {
    f: F,
    _marker: PhantomData<fn(T)>,
}

impl<T, F> FieldInvoker for FieldSetter<T, F>
where
    T: 'static,
    F: Fn(&mut T, Value) -> anyhow::Result<()> + Send + Sync,
{
    fn assign(&self, instance: &mut dyn Any, value: Value) -> anyhow::Result<()> {
        let this = instance
            .downcast_mut::<T>()
            .ok_or(ValueErrorKind::MissingReceiver { expected: type_name::<T>() })?;
        (self.f)(this, value)
    }
}

pub struct Field<T> {
    inner: Arc<FieldDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: 'static> Field<T> {
    /// Field of type `V`, assigned through `setter`.
    #[must_use]
    pub fn new<V: ?Sized + 'static>(
        name: &'static str,
        setter: impl Fn(&mut T, Value) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self::from_property(Property::field::<V>(name), setter)
    }

    /// Field constructed recursively (with fields) if no bind exists for `V`.
    #[must_use]
    pub fn auto_construct<V: Component>(
        name: &'static str,
        setter: impl Fn(&mut T, Value) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self::from_property(Property::field::<V>(name).auto_constructed::<V>(), setter)
    }

    fn from_property(mut property: Property, setter: impl Fn(&mut T, Value) -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        property.set_kind(PropertyKind::Field {
            declaring: TypeInfo::of::<T>(),
        });
        let setter = Arc::new(FieldSetter {
            f: setter,
            _marker: PhantomData,
        });
        Self {
            inner: Arc::new(FieldDescriptor {
                id: MemberId::next(),
                property,
                visibility: Visibility::Public,
                setter,
            }),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn tag<A: Tag>(mut self, tag: A) -> Self {
        let inner = edit(&mut self.inner);
        inner.property = inner.property.clone().with_tag(tag);
        self
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        edit(&mut self.inner).visibility = Visibility::Private;
        self
    }
}

impl<T> Field<T> {
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &FieldDescriptor {
        &self.inner
    }
}

struct Projected<T, B> {
    inner: Arc<dyn Invoker>,
    project: fn(&mut T) -> &mut B,
}

impl<T: 'static, B: 'static> Invoker for Projected<T, B> {
    fn invoke(&self, instance: Option<&mut dyn Any>, arguments: Arguments) -> anyhow::Result<Value> {
        let base = match instance {
            Some(instance) => {
                let this = instance
                    .downcast_mut::<T>()
                    .ok_or(ValueErrorKind::MissingReceiver { expected: type_name::<T>() })?;
                Some((self.project)(this) as &mut dyn Any)
            }
            None => None,
        };
        self.inner.invoke(base, arguments)
    }
}

struct ProjectedField<T, B> {
    inner: Arc<dyn FieldInvoker>,
    project: fn(&mut T) -> &mut B,
}

impl<T: 'static, B: 'static> FieldInvoker for ProjectedField<T, B> {
    fn assign(&self, instance: &mut dyn Any, value: Value) -> anyhow::Result<()> {
        let this = instance
            .downcast_mut::<T>()
            .ok_or(ValueErrorKind::MissingReceiver { expected: type_name::<T>() })?;
        self.inner.assign((self.project)(this), value)
    }
}

/// Describes the members of `T`, and of its ancestors lifted onto `T`.
pub struct Class<T> {
    type_info: TypeInfo,
    visibility: Visibility,
    constructors: Vec<Constructor<T>>,
    fields: Vec<Field<T>>,
    methods: Vec<Method<T>>,
    superclass: Option<Box<Class<T>>>,
}

impl<T: 'static> Default for Class<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Class<T> {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            visibility: Visibility::Public,
            constructors: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            superclass: None,
        }
    }

    #[must_use]
    pub fn constructor(mut self, constructor: Constructor<T>) -> Self {
        self.constructors.push(constructor);
        self
    }

    #[must_use]
    pub fn field(mut self, field: Field<T>) -> Self {
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn method(mut self, method: Method<T>) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    /// Inherits the fields and methods of `B`, reached through `project`.
    /// Constructors of `B` aren't inherited.
    #[must_use]
    pub fn extends<B: Component>(mut self, project: fn(&mut T) -> &mut B) -> Self {
        self.superclass = Some(Box::new(B::class().lift(project)));
        self
    }

    fn lift<S: 'static>(self, project: fn(&mut S) -> &mut T) -> Class<S> {
        let fields = self
            .fields
            .into_iter()
            .map(|field| {
                let mut descriptor = (*field.inner).clone();
                descriptor.setter = Arc::new(ProjectedField {
                    inner: descriptor.setter,
                    project,
                });
                Field {
                    inner: Arc::new(descriptor),
                    _marker: PhantomData,
                }
            })
            .collect();
        let methods = self
            .methods
            .into_iter()
            .map(|method| {
                let mut executable = (*method.inner).clone();
                executable.body = Arc::new(Projected {
                    inner: executable.body,
                    project,
                });
                Method {
                    inner: Arc::new(executable),
                    _marker: PhantomData,
                }
            })
            .collect();

        Class {
            type_info: self.type_info,
            visibility: self.visibility,
            constructors: Vec::new(),
            fields,
            methods,
            // Ancestors were lifted onto `T` already, so one projection reaches every level.
            superclass: self.superclass.map(|superclass| Box::new(superclass.lift(project))),
        }
    }
}

impl<T> Class<T> {
    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    #[inline]
    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[inline]
    #[must_use]
    pub fn declared_constructors(&self) -> &[Constructor<T>] {
        &self.constructors
    }

    #[inline]
    #[must_use]
    pub fn declared_fields(&self) -> &[Field<T>] {
        &self.fields
    }

    #[inline]
    #[must_use]
    pub fn declared_methods(&self) -> &[Method<T>] {
        &self.methods
    }

    #[inline]
    #[must_use]
    pub fn superclass(&self) -> Option<&Class<T>> {
        self.superclass.as_deref()
    }

    /// Walks from this class up through its ancestors.
    #[inline]
    #[must_use]
    pub fn hierarchy(&self) -> Hierarchy<'_, T> {
        Hierarchy { next: Some(self) }
    }

    /// Fields of the whole hierarchy: declaration order within a class, most-derived class first.
    pub fn fields(&self) -> impl Iterator<Item = &Field<T>> {
        self.hierarchy().flat_map(|class| class.fields.iter())
    }

    /// Methods of the whole hierarchy, in the same order as [`Self::fields`].
    pub fn methods(&self) -> impl Iterator<Item = &Method<T>> {
        self.hierarchy().flat_map(|class| class.methods.iter())
    }
}

pub struct Hierarchy<'a, T> {
    next: Option<&'a Class<T>>,
}

impl<'a, T> Iterator for Hierarchy<'a, T> {
    type Item = &'a Class<T>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.superclass();
        Some(current)
    }
}

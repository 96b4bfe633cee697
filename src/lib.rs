#![no_std]

extern crate alloc;

pub(crate) mod any;
pub(crate) mod bind;
pub(crate) mod cache;
pub(crate) mod class;
pub(crate) mod class_cache;
pub(crate) mod errors;
pub(crate) mod handler;
pub(crate) mod injector;
pub(crate) mod injectors;
pub(crate) mod invoker;
pub(crate) mod processor;
pub(crate) mod property;
pub(crate) mod resources;
pub(crate) mod tag;

pub use any::{TypeInfo, Value};
pub use bind::{Bind, BindKey};
pub use class::{Class, Component, Constructor, Executable, ExecutableKind, Field, FieldDescriptor, Hierarchy, MemberId, Method, Visibility};
pub use errors::{ConfigErrorKind, InjectErrorKind, ValueErrorKind};
pub use handler::BindHandler;
pub use injector::Injector;
pub use injectors::{ConstructorInjector, FieldsInjector, MethodInjector};
pub use invoker::{ensure_public, Arguments, FieldInvoker, GenericInvokerFactory, Invoker, InvokerFactory};
pub use parking_lot::RwLock;
pub use property::{Property, PropertyKind};
pub use resources::Resources;
pub use tag::{validate_tag, AutoConstruct, Inject, PostConstruct, Retention, Tag, TagInfo, TagInstance};

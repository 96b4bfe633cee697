mod constructor;
mod fields;
mod method;

pub use constructor::ConstructorInjector;
pub use fields::FieldsInjector;
pub use method::MethodInjector;

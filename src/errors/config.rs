use alloc::string::String;

/// Raised eagerly while wiring, before any value is resolved.
#[derive(thiserror::Error, Debug)]
pub enum ConfigErrorKind {
    #[error("Type `{type_name}` has to declare one and only one constructor, found {count}")]
    ConstructorCount { type_name: &'static str, count: usize },
    #[error("Tag `{tag}` is not marked as injectable")]
    TagNotInjectable { tag: &'static str },
    #[error("Tag `{tag}` is not retained at runtime")]
    TagNotRetained { tag: &'static str },
    #[error("Invoker for `{target}` requires a public target and declaring type")]
    NotPublic { target: String },
}

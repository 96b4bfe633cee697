#[derive(thiserror::Error, Debug)]
pub enum ValueErrorKind {
    #[error("Incorrect value type. Actual: {actual}, expected: {expected}")]
    IncorrectType { expected: &'static str, actual: &'static str },
    #[error("Argument index {index} out of bounds for {len} arguments")]
    OutOfBounds { index: usize, len: usize },
    #[error("Value of type {type_name} is still shared and can't be taken")]
    Shared { type_name: &'static str },
    #[error("Method requires an instance of {expected}, but none was given")]
    MissingReceiver { expected: &'static str },
}

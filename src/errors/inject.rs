use alloc::string::String;

use super::{ConfigErrorKind, ValueErrorKind};

#[derive(thiserror::Error, Debug)]
pub enum InjectErrorKind {
    #[error(
        "\
        Cannot find proper bind. \
        Missing bind for parameter: {parameter} (position {index}), \
        in executable: {executable}\
        "
    )]
    MissingBind {
        parameter: String,
        executable: String,
        index: usize,
    },
    #[error(transparent)]
    Configuration(#[from] ConfigErrorKind),
    #[error("Failed to resolve value for {target}")]
    Resolve {
        target: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Failed to invoke {target}")]
    Invoke {
        target: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    Value(#[from] ValueErrorKind),
}

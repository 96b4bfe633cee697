mod config;
mod inject;
mod value;

pub use config::ConfigErrorKind;
pub use inject::InjectErrorKind;
pub use value::ValueErrorKind;

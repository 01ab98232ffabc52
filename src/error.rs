use crate::types::CompileReport;

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Submission too large (max {max} bytes, got {actual} bytes)")]
    CodeTooLarge { max: usize, actual: usize },

    #[error("{0}")]
    Compile(CompileReport),

    #[cfg(feature = "security")]
    #[error("Dangerous code detected: {0}")]
    DangerousCode(String),

    #[error("The entry point must take no parameters")]
    InvalidMainArgs { found: usize },

    #[error("Reference '{name}' could not be resolved: {detail}")]
    Reference { name: String, detail: String },

    #[error("Program does not declare a 'main' entry point")]
    MissingEntryPoint,

    #[error("Program declares more than one 'main' entry point")]
    MultipleEntryPoints,

    #[error("Entry point is not callable at invocation time")]
    EntryPointNotCallable,

    #[error("Internal error: {0}")]
    Internal(String),
}

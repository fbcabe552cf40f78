use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Multiple JVM processes match '{pattern}':\n{matches}Use --pid to specify exactly one.")]
    MultipleProcesses { pattern: String, matches: String },

    #[error("PID {0} does not look like a JVM process")]
    NotAJvm(u32),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("JDK tool '{name}' not found. Set JAVA_HOME or add the JDK bin directory to PATH")]
    ToolNotFound { name: String },

    #[error("{tool} failed for PID {pid}: {message}")]
    ToolFailed {
        tool: String,
        pid: u32,
        message: String,
    },

    #[error("Unparseable thread dump: {0}")]
    ThreadDump(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const PROCESS_NOT_FOUND: i32 = 3;
    pub const PERMISSION_DENIED: i32 = 4;
    pub const TOOL_NOT_FOUND: i32 = 5;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ProcessNotFound(_) | Error::MultipleProcesses { .. } | Error::NotAJvm(_) => {
                exit_code::PROCESS_NOT_FOUND
            }
            Error::PermissionDenied(_) => exit_code::PERMISSION_DENIED,
            Error::ToolNotFound { .. } => exit_code::TOOL_NOT_FOUND,
            Error::InvalidArgument(_) => exit_code::INVALID_ARGUMENTS,
            _ => exit_code::GENERAL_ERROR,
        }
    }
}

use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }

    pub fn index_out_of_range(index: u64, len: u64) -> Error {
        Error(ErrorKind::IndexOutOfRange { index, len }.into())
    }

    pub fn corrupt_index(record: u64, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::CorruptIndex {
                record,
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn codec<E>(context: impl Into<String>, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::Codec {
                context: context.into(),
                source: source.into(),
            }
            .into(),
        )
    }

    /// Returns `true` if this error was raised by a failed operating system I/O call.
    pub fn is_io(&self) -> bool {
        matches!(self.kind(), ErrorKind::Io { .. })
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },

    #[error("position {index} is out of range (length {len})")]
    IndexOutOfRange { index: u64, len: u64 },

    #[error("corrupt offset index at record {record}: {message}")]
    CorruptIndex { record: u64, message: String },

    #[error("record codec error: {context}")]
    Codec {
        context: String,
        source: StdErrorBoxed,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

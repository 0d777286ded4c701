use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum LinkError {
    Io(std::io::Error),
    LockPoisoned(String),
    Node {
        message: String,
        code: i64,
        source: Option<Box<dyn Error + Send + Sync>>,
    },
}

impl LinkError {
    pub fn node_error<T: Into<String>>(message: T, code: i64) -> Self {
        Self::Node {
            message: message.into(),
            code,
            source: None,
        }
    }

    pub fn with_source(self, source: impl Error + Send + Sync + 'static) -> Self {
        match self {
            Self::Node { message, code, .. } => Self::Node {
                message,
                code,
                source: Some(Box::new(source)),
            },
            _ => self,
        }
    }
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {}", e),
            Self::LockPoisoned(what) => write!(f, "Engine lock poisoned: {}", what),
            Self::Node {
                message,
                code,
                source,
            } => {
                write!(f, "Node error (code {}): {}", code, message)?;
                if let Some(src) = source {
                    write!(f, " (Caused by: {})", src)?;
                }
                Ok(())
            }
        }
    }
}

impl Error for LinkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::LockPoisoned(_) => None,
            Self::Node { source, .. } => source.as_ref().map(|e| e.as_ref() as &dyn Error),
        }
    }
}

impl From<std::io::Error> for LinkError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error)
    }
}

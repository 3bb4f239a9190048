use dynarr_mem::CapacityError;

#[derive(Debug)]
pub enum LogError {
    Capacity(CapacityError),
    Io(std::io::Error),
    Fmt(core::fmt::Error),
    NotInitialized,
}

impl core::fmt::Display for LogError {

    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Capacity(_) => write!(f, "failed to store log format"),
            Self::Io(_) => write!(f, "IO error"),
            Self::Fmt(_) => write!(f, "failed to format log message"),
            Self::NotInitialized => write!(f, "logger not initialized"),
        }
    }
}

impl core::error::Error for LogError {

    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Capacity(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Fmt(err) => Some(err),
            Self::NotInitialized => None,
        }
    }
}

impl From<CapacityError> for LogError {

    fn from(value: CapacityError) -> Self {
        Self::Capacity(value)
    }
}

impl From<std::io::Error> for LogError {

    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<core::fmt::Error> for LogError {

    fn from(value: core::fmt::Error) -> Self {
        Self::Fmt(value)
    }
}

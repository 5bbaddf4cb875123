#[derive(Debug)]
pub enum FeatureIoError {
    Io(std::io::Error),
    Parse { line: usize, message: String },
    Truncated { expected: usize, found: usize },
    EmptyFeatureSet,
    InconsistentDimension { index: usize, expected: usize, actual: usize },
}

impl std::fmt::Display for FeatureIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeatureIoError::Io(e) => write!(f, "I/O error: {}", e),
            FeatureIoError::Parse { line, message } => {
                write!(f, "Parse error at line {}: {}", line, message)
            }
            FeatureIoError::Truncated { expected, found } => {
                write!(f, "Feature file truncated: expected {} features, found {}", expected, found)
            }
            FeatureIoError::EmptyFeatureSet => write!(f, "No features to export"),
            FeatureIoError::InconsistentDimension { index, expected, actual } => {
                write!(f, "Feature {} has a {}-D descriptor, expected {}-D", index, actual, expected)
            }
        }
    }
}

impl std::error::Error for FeatureIoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeatureIoError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FeatureIoError {
    fn from(err: std::io::Error) -> Self {
        FeatureIoError::Io(err)
    }
}

pub type FeatureIoResult<T> = Result<T, FeatureIoError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlignError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML encoding error: {0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Missing required input: {what}")]
    MissingInputError { what: String },

    #[error("Malformed mapping table: {message}")]
    MappingTableError { message: String },

    #[error("Cannot read spreadsheet '{file}': {message}")]
    SpreadsheetError { file: String, message: String },

    #[error("Duplicate destination header '{header}' (rules {first_row} and {second_row})")]
    DuplicateHeaderError {
        header: String,
        first_row: usize,
        second_row: usize,
    },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, AlignError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Configuration,
    Mapping,
    Format,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 命令列結束碼
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl AlignError {
    pub fn spreadsheet(file: &str, message: impl Into<String>) -> Self {
        AlignError::SpreadsheetError {
            file: file.to_string(),
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AlignError::MissingInputError { .. } => ErrorCategory::Input,
            AlignError::ConfigError { .. }
            | AlignError::ConfigValidationError { .. }
            | AlignError::InvalidConfigValueError { .. }
            | AlignError::MissingConfigError { .. } => ErrorCategory::Configuration,
            AlignError::MappingTableError { .. } | AlignError::DuplicateHeaderError { .. } => {
                ErrorCategory::Mapping
            }
            AlignError::ZipError(_)
            | AlignError::CsvError(_)
            | AlignError::XmlError(_)
            | AlignError::XmlAttributeError(_)
            | AlignError::XmlEncodingError(_)
            | AlignError::SpreadsheetError { .. } => ErrorCategory::Format,
            AlignError::IoError(_) | AlignError::ProcessingError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Mapping | ErrorCategory::Format => ErrorSeverity::High,
            ErrorCategory::System => match self {
                AlignError::IoError(_) => ErrorSeverity::Critical,
                _ => ErrorSeverity::Medium,
            },
        }
    }

    /// 給終端使用者看的錯誤描述
    pub fn user_friendly_message(&self) -> String {
        match self {
            AlignError::MissingInputError { what } => {
                format!("Please provide the {}.", what)
            }
            AlignError::MappingTableError { message } => {
                format!("The mapping sheet could not be used: {}", message)
            }
            AlignError::SpreadsheetError { file, message } => {
                format!("The file '{}' could not be read: {}", file, message)
            }
            AlignError::DuplicateHeaderError { header, .. } => {
                format!("The mapping sheet maps '{}' more than once.", header)
            }
            AlignError::IoError(e) => format!("File system error: {}", e),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Input => "Check that the source export and mapping sheet paths exist",
            ErrorCategory::Configuration => "Review the command line flags or the TOML job file",
            ErrorCategory::Mapping => {
                "The mapping sheet needs 'Template Header' and 'CoStar data header' columns with unique headers"
            }
            ErrorCategory::Format => "Re-export the file as .xlsx or .csv and try again",
            ErrorCategory::System => "Check disk space and permissions of the output directory",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_is_high_severity() {
        let err = AlignError::MissingInputError {
            what: "CoStar Sale Comps file".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Input);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert_eq!(
            err.user_friendly_message(),
            "Please provide the CoStar Sale Comps file."
        );
    }

    #[test]
    fn test_io_error_is_critical() {
        let err: AlignError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert_eq!(err.category(), ErrorCategory::System);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert_eq!(err.severity().exit_code(), 3);
    }

    #[test]
    fn test_duplicate_header_message_names_header() {
        let err = AlignError::DuplicateHeaderError {
            header: "Price".to_string(),
            first_row: 2,
            second_row: 5,
        };
        assert!(err.to_string().contains("'Price'"));
        assert!(err.to_string().contains("rules 2 and 5"));
        assert_eq!(err.category(), ErrorCategory::Mapping);
    }
}

use std::fmt;

/// Machine-readable error codes for scripting and agent-friendly output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigReadFailed,
    ConfigParseError,
    SourceUnreadable,
    TooFewColumns,
    MalformedRecord,
    InvalidWeight,
    EmptyDataset,
    ExportFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigReadFailed => "E1001",
            Self::ConfigParseError => "E1002",
            Self::SourceUnreadable => "E2001",
            Self::TooFewColumns => "E2002",
            Self::MalformedRecord => "E2003",
            Self::InvalidWeight => "E2004",
            Self::EmptyDataset => "E2005",
            Self::ExportFailed => "E5001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigReadFailed => "Config file unreadable",
            Self::ConfigParseError => "Config file parse error",
            Self::SourceUnreadable => "Dataset file unreadable",
            Self::TooFewColumns => "Dataset has too few columns",
            Self::MalformedRecord => "Malformed dataset record",
            Self::InvalidWeight => "Invalid weight value",
            Self::EmptyDataset => "Dataset has no triples",
            Self::ExportFailed => "Graph export failed",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigReadFailed => Some("Check the --config path and its permissions."),
            Self::ConfigParseError => Some("Fix syntax in affinity.toml and retry."),
            Self::SourceUnreadable => Some("Check that the dataset path exists and is readable."),
            Self::TooFewColumns => {
                Some("Use subject,item,weight columns separated by ',' or ';'.")
            }
            Self::MalformedRecord => {
                Some("Every row needs a non-empty subject and item in the first two columns.")
            }
            Self::InvalidWeight => Some("Weights must be finite, non-negative numbers."),
            Self::EmptyDataset => Some("Add at least one subject,item,weight row after the header."),
            Self::ExportFailed => Some("Check disk space and write permissions for the output directory."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

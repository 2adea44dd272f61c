//! Error types shared by decoding and encoding.

use alloc::boxed::Box;
use alloc::format;
use alloc::string::{String, ToString};
use core::fmt::{self, Display};

use crate::span::Span;
use crate::tokenizer::{TokenError, TokenErrorKind};

/// Prefix carried by every error this crate raises itself.
pub const PREFIX: &str = "spillover: ";

/// Error type for spillover decoding and encoding.
#[derive(Debug)]
pub struct Error {
    /// The specific kind of error
    pub kind: ErrorKind,
    /// Source span where the error occurred
    pub span: Option<Span>,
    /// The source input (for diagnostics)
    pub source_code: Option<String>,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for Error {}

impl miette::Diagnostic for Error {
    fn code<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        Some(Box::new(self.kind.code()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_code
            .as_ref()
            .map(|s| s as &dyn miette::SourceCode)
    }

    fn help<'a>(&'a self) -> Option<Box<dyn Display + 'a>> {
        match &self.kind {
            ErrorKind::MissingSpilloverField {
                suggestion: Some(suggested),
                ..
            } => Some(Box::new(format!("did you mean `{suggested}`?"))),
            ErrorKind::DuplicateWireKey { .. } => Some(Box::new(
                "give one of the fields a distinct tag, or exclude it with \"-\"",
            )),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(core::iter::once(miette::LabeledSpan::new(
            Some(self.kind.label()),
            span.start,
            span.len,
        ))))
    }
}

impl Error {
    /// Create a new error with span information
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Error {
            kind,
            span: Some(span),
            source_code: None,
        }
    }

    /// Create an error without span information
    pub fn without_span(kind: ErrorKind) -> Self {
        Error {
            kind,
            span: None,
            source_code: None,
        }
    }

    /// Attach source code for rich diagnostics
    ///
    /// The span is widened to whole characters of `source`.
    pub fn with_source(mut self, source: &str) -> Self {
        if let Some(span) = &mut self.span {
            let mut start = span.start.min(source.len());
            while !source.is_char_boundary(start) {
                start -= 1;
            }
            let mut end = span.end().clamp(start, source.len());
            while !source.is_char_boundary(end) {
                end += 1;
            }
            *span = Span::between(start, end);
        }
        self.source_code = Some(source.to_string());
        self
    }
}

/// Specific error kinds.
///
/// The first group describes the shape of the target type and is always
/// reported before any input is read. The second group is raised while
/// walking the object. `Token` and `Json` are passed through from the
/// tokenizer and from `serde_json` without reinterpretation.
#[derive(Debug)]
pub enum ErrorKind {
    /// The target is not a mutable reference
    NotGivenMutable,
    /// The target type is not a record
    NotStructHolder {
        /// Name of the target type
        type_name: &'static str,
    },
    /// The named overflow field does not exist
    MissingSpilloverField {
        /// The requested overflow field name
        field: String,
        /// A declared field with a similar name, if any
        suggestion: Option<&'static str>,
    },
    /// The overflow field is not a map with string-like keys
    SpillNotRightMap {
        /// The overflow field name
        field: &'static str,
        /// The field's declared type
        type_name: &'static str,
    },
    /// The overflow field cannot be written to
    UnsetableSpilloverField {
        /// The overflow field name
        field: &'static str,
    },
    /// Two declared fields resolve to the same wire key
    DuplicateWireKey {
        /// The shared wire key
        key: &'static str,
        /// Field declared first
        first: &'static str,
        /// Field declared second
        second: &'static str,
    },
    /// The input names a field that this decoder may not write
    ReadOnlyField {
        /// The declared field name
        field: &'static str,
    },
    /// The input does not start with `{`
    NotGivenStruct {
        /// The token that was required
        expected: &'static str,
        /// The token that was found
        got: String,
    },
    /// An object key was not a string
    GivenNonStringKey {
        /// The token found in key position
        got: String,
    },
    /// The object did not end with `}`
    MalformedJson {
        /// The token found instead
        got: String,
    },
    /// Tokenizer error
    Token(TokenErrorKind),
    /// Error from `serde_json` while decoding or encoding a value
    Json(serde_json::Error),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::NotGivenMutable => {
                write!(f, "{PREFIX}not given something which we can assign to")
            }
            ErrorKind::NotStructHolder { type_name } => {
                write!(f, "{PREFIX}holder is not a struct: `{type_name}`")
            }
            ErrorKind::MissingSpilloverField { field, suggestion } => {
                write!(
                    f,
                    "{PREFIX}target struct missing specified spillover field `{field}`"
                )?;
                if let Some(suggested) = suggestion {
                    write!(f, " (did you mean `{suggested}`?)")?;
                }
                Ok(())
            }
            ErrorKind::SpillNotRightMap { field, type_name } => write!(
                f,
                "{PREFIX}target's spillover field is not a string-keyed map: `{field}` is `{type_name}`"
            ),
            ErrorKind::UnsetableSpilloverField { field } => write!(
                f,
                "{PREFIX}target struct's spillover field not assignable: `{field}`"
            ),
            ErrorKind::DuplicateWireKey { key, first, second } => write!(
                f,
                "{PREFIX}fields `{first}` and `{second}` both decode from key `{key}`"
            ),
            ErrorKind::ReadOnlyField { field } => write!(
                f,
                "{PREFIX}field `{field}` is read-only and cannot be decoded"
            ),
            ErrorKind::NotGivenStruct { expected, got } => write!(
                f,
                "{PREFIX}not given a struct in the raw stream: expected {expected} got {got}"
            ),
            ErrorKind::GivenNonStringKey { got } => {
                write!(f, "{PREFIX}given object with non-string key: {got}")
            }
            ErrorKind::MalformedJson { got } => {
                write!(f, "{PREFIX}given malformed JSON: expected '}}' got {got}")
            }
            ErrorKind::Token(e) => write!(f, "{e}"),
            ErrorKind::Json(e) => write!(f, "{e}"),
        }
    }
}

impl ErrorKind {
    /// Get an error code for this kind of error.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::NotGivenMutable => "spillover::not_given_mutable",
            ErrorKind::NotStructHolder { .. } => "spillover::not_struct_holder",
            ErrorKind::MissingSpilloverField { .. } => "spillover::missing_spillover_field",
            ErrorKind::SpillNotRightMap { .. } => "spillover::spill_not_right_map",
            ErrorKind::UnsetableSpilloverField { .. } => "spillover::unsetable_spillover_field",
            ErrorKind::DuplicateWireKey { .. } => "spillover::duplicate_wire_key",
            ErrorKind::ReadOnlyField { .. } => "spillover::read_only_field",
            ErrorKind::NotGivenStruct { .. } => "spillover::not_given_struct",
            ErrorKind::GivenNonStringKey { .. } => "spillover::given_non_string_key",
            ErrorKind::MalformedJson { .. } => "spillover::malformed_json",
            ErrorKind::Token(_) => "spillover::token",
            ErrorKind::Json(_) => "spillover::json",
        }
    }

    /// Get a label describing where/what the error points to.
    pub fn label(&self) -> String {
        match self {
            ErrorKind::NotGivenStruct { expected, got } => {
                format!("expected {expected}, got {got}")
            }
            ErrorKind::ReadOnlyField { field } => format!("`{field}` is read-only"),
            ErrorKind::GivenNonStringKey { got } => format!("key must be a string, got {got}"),
            ErrorKind::MalformedJson { got } => format!("expected '}}', got {got}"),
            ErrorKind::Token(e) => match e {
                TokenErrorKind::UnexpectedCharacter { found, .. } => format!("unexpected {found:?}"),
                TokenErrorKind::ExpectedColon => "expected ':' here".into(),
                TokenErrorKind::ExpectedComma => "expected ',' here".into(),
                TokenErrorKind::UnexpectedEof => "unexpected end of input".into(),
            },
            ErrorKind::Json(e) => match e.classify() {
                serde_json::error::Category::Data => "cannot decode this value".into(),
                serde_json::error::Category::Eof => "unexpected end of input".into(),
                serde_json::error::Category::Syntax => "invalid JSON here".into(),
                serde_json::error::Category::Io => "read failed here".into(),
            },
            other => other.to_string(),
        }
    }

    /// Whether this error describes the target type rather than the input.
    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            ErrorKind::NotGivenMutable
                | ErrorKind::NotStructHolder { .. }
                | ErrorKind::MissingSpilloverField { .. }
                | ErrorKind::SpillNotRightMap { .. }
                | ErrorKind::UnsetableSpilloverField { .. }
                | ErrorKind::DuplicateWireKey { .. }
        )
    }

    /// Whether this error was passed through from the tokenizer or `serde_json`.
    pub fn is_bubbled(&self) -> bool {
        matches!(self, ErrorKind::Token(_) | ErrorKind::Json(_))
    }
}

impl From<TokenError> for Error {
    fn from(err: TokenError) -> Self {
        Error {
            kind: ErrorKind::Token(err.kind),
            span: Some(err.span),
            source_code: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Json(err),
            span: None,
            source_code: None,
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error::without_span(kind)
    }
}

/// Result type for spillover decoding and encoding
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_errors_carry_the_prefix() {
        let kinds = [
            ErrorKind::NotGivenMutable,
            ErrorKind::NotStructHolder { type_name: "Vec<u8>" },
            ErrorKind::MissingSpilloverField {
                field: "Rest".into(),
                suggestion: Some("rest"),
            },
            ErrorKind::SpillNotRightMap {
                field: "rest",
                type_name: "String",
            },
            ErrorKind::UnsetableSpilloverField { field: "rest" },
            ErrorKind::DuplicateWireKey {
                key: "a",
                first: "a",
                second: "b",
            },
            ErrorKind::ReadOnlyField { field: "label" },
            ErrorKind::NotGivenStruct {
                expected: "'{'",
                got: "'['".into(),
            },
            ErrorKind::GivenNonStringKey {
                got: "number 4".into(),
            },
            ErrorKind::MalformedJson { got: "']'".into() },
        ];
        for kind in kinds {
            assert!(kind.to_string().starts_with(PREFIX), "{kind}");
            assert!(!kind.is_bubbled());
        }
    }

    #[test]
    fn attached_source_widens_span_to_characters() {
        let source = "{\"é\": 1}";
        let err = Error::new(ErrorKind::Token(TokenErrorKind::UnexpectedEof), Span::new(3, 1))
            .with_source(source);
        assert_eq!(err.span, Some(Span::new(2, 2)));

        let err = Error::new(ErrorKind::Token(TokenErrorKind::UnexpectedEof), Span::new(40, 0))
            .with_source(source);
        assert_eq!(err.span, Some(Span::new(source.len(), 0)));
    }

    #[test]
    fn token_errors_render_natively() {
        let kind = ErrorKind::Token(TokenErrorKind::UnexpectedEof);
        assert_eq!(kind.to_string(), "unexpected end of input");
        assert!(kind.is_bubbled());
        assert!(!kind.is_declaration());
    }
}

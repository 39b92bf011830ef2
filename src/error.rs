use std::{error, fmt, io};

/// Failure reading or tokenizing a catalogue document.
#[derive(Debug)]
pub enum ParseError {
    Xml(quick_xml::Error),
    UnexpectedRoot(String),
    UnknownElement { parent: &'static str, name: String },
    UnexpectedEof { parent: &'static str },
    MissingField { id: Option<u32>, field: &'static str },
    InvalidId(String),
    UnknownEnum { field: &'static str, value: String },
    InvalidInteger { field: &'static str, value: String },
    InvalidDuration { field: &'static str, value: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Xml(e) => write!(f, "FIESER: XML syntax error: {e}"),
            Self::UnexpectedRoot(name) => {
                write!(f, "FIESER: Syntax error: expected <injection>, found <{name}>")
            }
            Self::UnknownElement { parent, name } => {
                write!(f, "FIESER: Syntax error: unknown element <{name}> inside <{parent}>")
            }
            Self::UnexpectedEof { parent } => {
                write!(f, "FIESER: Syntax error: unexpected end of document inside <{parent}>")
            }
            Self::MissingField { id, field } => match id {
                Some(id) => write!(f, "FIESER: fault id {id} semantic error: missing field '{field}'"),
                None => write!(f, "FIESER: Syntax error: fault is missing required field '{field}'"),
            },
            Self::InvalidId(value) => {
                write!(f, "FIESER: Syntax error: invalid fault id '{value}'")
            }
            Self::UnknownEnum { field, value } => {
                write!(f, "FIESER: Syntax error: unrecognized value '{value}' for field '{field}'")
            }
            Self::InvalidInteger { field, value } => {
                write!(f, "FIESER: Syntax error: invalid integer '{value}' for field '{field}'")
            }
            Self::InvalidDuration { field, value } => {
                write!(f, "FIESER: Syntax error: invalid duration '{value}' for field '{field}'")
            }
        }
    }
}

impl error::Error for ParseError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Xml(e) => Some(e),
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for ParseError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e)
    }
}

/// A single catalogue-level semantic violation, matched against one fault id.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub id: u32,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FIESER: fault id {} semantic error: {}", self.id, self.message)
    }
}

impl error::Error for ValidationError {}

impl ValidationError {
    pub(crate) fn new(id: u32, message: impl Into<String>) -> Self {
        Self { id, message: message.into() }
    }
}

/// Top-level failure of a catalogue (re)load.
#[derive(Debug)]
pub enum EngineError {
    Io(io::Error),
    Parse(ParseError),
    Validation(Vec<ValidationError>),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "FIESER: could not load configuration file: {e}"),
            Self::Parse(e) => write!(f, "{e}"),
            Self::Validation(errors) => {
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "{e}")?;
                }
                Ok(())
            }
        }
    }
}

impl error::Error for EngineError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Validation(errors) => errors.first().map(|e| e as &(dyn error::Error + 'static)),
        }
    }
}

impl From<io::Error> for EngineError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<ParseError> for EngineError {
    fn from(e: ParseError) -> Self {
        Self::Parse(e)
    }
}

impl From<Vec<ValidationError>> for EngineError {
    fn from(e: Vec<ValidationError>) -> Self {
        Self::Validation(e)
    }
}

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum ZeffCtError {
    UnknownElement(u32),
    InvalidComposition(String),
    NotCommitted(String),
    AlreadyCommitted(String),
    NoAdmissibleRoot { method: &'static str, target: f64 },
    NonConvergence { method: &'static str, iterations: usize },
    Numerical(String),
    Pairing(String),
    DataError(String),
}

pub type Result<T> = std::result::Result<T, ZeffCtError>;

impl fmt::Display for ZeffCtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownElement(z) => write!(f, "unknown element: Z = {z}"),
            Self::InvalidComposition(msg) => write!(f, "invalid composition: {msg}"),
            Self::NotCommitted(name) => write!(f, "material '{name}' not committed"),
            Self::AlreadyCommitted(name) => write!(f, "material '{name}' already committed"),
            Self::NoAdmissibleRoot { method, target } => {
                write!(f, "{method}: no admissible root for target {target:e}")
            }
            Self::NonConvergence { method, iterations } => {
                write!(f, "{method}: no convergence after {iterations} iterations")
            }
            Self::Numerical(msg) => write!(f, "numerical error: {msg}"),
            Self::Pairing(msg) => write!(f, "pairing error: {msg}"),
            Self::DataError(msg) => write!(f, "data error: {msg}"),
        }
    }
}

impl std::error::Error for ZeffCtError {}

use std::fmt;

/// A value could not be converted between two representations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    from: &'static str,
    to: &'static str,
}

impl ConversionError {
    pub fn new(from: &'static str, to: &'static str) -> Self {
        Self { from, to }
    }
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot convert {} into {}", self.from, self.to)
    }
}

impl std::error::Error for ConversionError {}

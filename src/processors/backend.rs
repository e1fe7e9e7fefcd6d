//! Manipulation backend contract.
//!
//! The orchestrator never knows the operation catalogue of a backend. It
//! opens a handle on a source path, forwards `(name, args)` pairs to it and
//! finally asks it to write or stream the encoded result. Backends decide
//! which names they understand and fail with
//! [`ImagerError::ProcessingError`](crate::ImagerError) for the rest.

use crate::core::{Dimensions, Result};
use std::borrow::Cow;
use std::fmt;
use std::io::Read;
use std::path::Path;

/// Opens manipulation handles on source images.
pub trait ImageManipulator: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn ImageHandle>>;
}

/// A stateful, in-progress transformation of one source image.
pub trait ImageHandle: Send {
    /// Current geometry, reflecting operations applied so far.
    fn size(&mut self) -> Result<Dimensions>;

    fn apply(&mut self, operation: &Operation) -> Result<()>;

    /// Encodes the current state to `destination`; format follows its extension.
    fn write(&mut self, destination: &Path) -> Result<()>;

    /// Encoded bytes in the source format.
    fn stream(&mut self) -> Result<Box<dyn Read + Send>>;
}

/// One positional argument of a named operation.
#[derive(Debug, Clone, PartialEq)]
pub enum OpArg {
    Int(i64),
    Float(f64),
    Text(String),
    Absent,
}

impl OpArg {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            OpArg::Int(v) => Some(*v as f64),
            OpArg::Float(v) => Some(*v),
            OpArg::Text(s) => s.trim().parse().ok(),
            OpArg::Absent => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        self.as_f64()
            .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
            .map(|v| v.round() as u32)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OpArg::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, OpArg::Absent)
    }
}

impl fmt::Display for OpArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpArg::Int(v) => write!(f, "{}", v),
            OpArg::Float(v) => write!(f, "{}", v),
            OpArg::Text(s) => write!(f, "{}", s),
            OpArg::Absent => f.write_str("null"),
        }
    }
}

impl From<i64> for OpArg {
    fn from(v: i64) -> Self {
        OpArg::Int(v)
    }
}

impl From<i32> for OpArg {
    fn from(v: i32) -> Self {
        OpArg::Int(v as i64)
    }
}

impl From<u32> for OpArg {
    fn from(v: u32) -> Self {
        OpArg::Int(v as i64)
    }
}

impl From<f32> for OpArg {
    fn from(v: f32) -> Self {
        OpArg::Float(v as f64)
    }
}

impl From<f64> for OpArg {
    fn from(v: f64) -> Self {
        OpArg::Float(v)
    }
}

impl From<&str> for OpArg {
    fn from(v: &str) -> Self {
        OpArg::Text(v.to_string())
    }
}

impl From<String> for OpArg {
    fn from(v: String) -> Self {
        OpArg::Text(v)
    }
}

impl<T: Into<OpArg>> From<Option<T>> for OpArg {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(OpArg::Absent)
    }
}

/// A named backend operation with its arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    name: Cow<'static, str>,
    args: Vec<OpArg>,
}

impl Operation {
    pub fn new(name: impl Into<Cow<'static, str>>, args: Vec<OpArg>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[OpArg] {
        &self.args
    }

    /// Argument at `index`, `Absent` past the end.
    pub fn arg(&self, index: usize) -> &OpArg {
        self.args.get(index).unwrap_or(&OpArg::Absent)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_text_arguments_parse() {
        assert_eq!(OpArg::from("+4").as_f64(), Some(4.0));
        assert_eq!(OpArg::from("-20").as_f64(), Some(-20.0));
        assert_eq!(OpArg::from("Center").as_f64(), None);
        assert_eq!(OpArg::from(-3).as_u32(), None);
        assert_eq!(OpArg::from(2.6f32).as_u32(), Some(3));
    }

    #[test]
    fn missing_arguments_read_as_absent() {
        let op = Operation::new("resize", vec![OpArg::from(Some(100u32)), OpArg::from(None::<u32>)]);
        assert_eq!(op.arg(0).as_u32(), Some(100));
        assert!(op.arg(1).is_absent());
        assert!(op.arg(7).is_absent());
    }

    #[test]
    fn operations_display_like_calls() {
        let op = Operation::new("colorize", vec![10.into(), (-20).into(), "x".into()]);
        assert_eq!(op.to_string(), "colorize(10, -20, x)");
        assert_eq!(Operation::new("sepia", Vec::new()).to_string(), "sepia()");
    }
}

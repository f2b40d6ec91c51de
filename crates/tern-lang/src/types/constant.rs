use std::fmt;

use crate::types::Type;

/// A folded compile-time value. The annotation pass stores these without inspecting them.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Boolean(bool),
    Char(char),
    String(String),
    Null,
}

impl ConstantValue {
    pub fn ty(&self) -> Type {
        match self {
            ConstantValue::Byte(_)    => Type::Byte,
            ConstantValue::Short(_)   => Type::Short,
            ConstantValue::Int(_)     => Type::Int,
            ConstantValue::Long(_)    => Type::Long,
            ConstantValue::Float(_)   => Type::Float,
            ConstantValue::Double(_)  => Type::Double,
            ConstantValue::Boolean(_) => Type::Boolean,
            ConstantValue::Char(_)    => Type::Char,
            ConstantValue::String(_)  => Type::String,
            ConstantValue::Null       => Type::Null,
        }
    }

    /// Text this value contributes when spliced into a string template.
    pub fn template_text(&self) -> String {
        match self {
            ConstantValue::String(s) => s.clone(),
            ConstantValue::Long(v)   => v.to_string(),
            ConstantValue::Float(v)  => v.to_string(),
            ConstantValue::Char(c)   => c.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Byte(v)    => write!(f, "{v}"),
            ConstantValue::Short(v)   => write!(f, "{v}"),
            ConstantValue::Int(v)     => write!(f, "{v}"),
            ConstantValue::Long(v)    => write!(f, "{v}L"),
            ConstantValue::Float(v)   => write!(f, "{v:?}f"),
            ConstantValue::Double(v)  => write!(f, "{v:?}"),
            ConstantValue::Boolean(v) => write!(f, "{v}"),
            ConstantValue::Char(c)    => write!(f, "'{c}'"),
            ConstantValue::String(s)  => write!(f, "{s:?}"),
            ConstantValue::Null       => f.write_str("null"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_types() {
        assert_eq!(ConstantValue::Short(3).ty(), Type::Short);
        assert_eq!(ConstantValue::String("a".into()).ty(), Type::String);
        assert_eq!(ConstantValue::Null.ty(), Type::Null);
    }

    #[test]
    fn display_is_source_like() {
        assert_eq!(ConstantValue::Long(5).to_string(), "5L");
        assert_eq!(ConstantValue::Float(1.5).to_string(), "1.5f");
        assert_eq!(ConstantValue::Double(2.0).to_string(), "2.0");
        assert_eq!(ConstantValue::String("hi".into()).to_string(), "\"hi\"");
        assert_eq!(ConstantValue::Char('x').to_string(), "'x'");
    }

    #[test]
    fn template_text_unquotes_strings() {
        assert_eq!(ConstantValue::String("hi".into()).template_text(), "hi");
        assert_eq!(ConstantValue::Int(4).template_text(), "4");
        assert_eq!(ConstantValue::Long(4).template_text(), "4");
        assert_eq!(ConstantValue::Char('c').template_text(), "c");
    }
}

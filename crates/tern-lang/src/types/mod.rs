//! Semantic types produced by the typing services and stored in the binding context.

pub mod constant;
pub mod ops;

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Boolean,
    Char,
    String,
    Unit,
    Any,
    /// Type of `return` and other expressions that never complete.
    Nothing,
    /// Type of the `null` literal.
    Null,
    /// A user class or object, by name.
    Class(String),
    Array(Box<Type>),
    Fn(Vec<Type>, Box<Type>),
    /// Sentinel for failed resolution. Carries a short reason for display.
    Error(String),
}

impl Type {
    pub fn error(reason: impl Into<String>) -> Self {
        Type::Error(reason.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error(_))
    }

    /// Names the collector pre-seeds into the file scope.
    pub const BUILTIN_NAMES: [&'static str; 12] = [
        "Byte", "Short", "Int", "Long", "Float", "Double",
        "Boolean", "Char", "String", "Any", "Unit", "Array",
    ];

    /// Built-in type for a bare name. `Array` needs an argument and is handled by the caller.
    pub fn builtin(name: &str) -> Option<Type> {
        Some(match name {
            "Byte"    => Type::Byte,
            "Short"   => Type::Short,
            "Int"     => Type::Int,
            "Long"    => Type::Long,
            "Float"   => Type::Float,
            "Double"  => Type::Double,
            "Boolean" => Type::Boolean,
            "Char"    => Type::Char,
            "String"  => Type::String,
            "Any"     => Type::Any,
            "Unit"    => Type::Unit,
            _ => return None,
        })
    }

    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Byte | Type::Short | Type::Int | Type::Long)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integral() || matches!(self, Type::Float | Type::Double)
    }

    /// `self` may be used where `other` is expected.
    pub fn is_subtype_of(&self, other: &Type) -> bool {
        if self.is_error() || other.is_error() {
            return true;
        }
        match (self, other) {
            (a, b) if a == b => true,
            (Type::Nothing, _) => true,
            (_, Type::Any) => true,
            (Type::Array(a), Type::Array(b)) => a.is_subtype_of(b),
            _ => false,
        }
    }

    /// Least common supertype of two branch types.
    pub fn join(&self, other: &Type) -> Type {
        if self.is_subtype_of(other) && !self.is_error() {
            other.clone()
        } else if other.is_subtype_of(self) {
            self.clone()
        } else {
            Type::Any
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Byte     => f.write_str("Byte"),
            Type::Short    => f.write_str("Short"),
            Type::Int      => f.write_str("Int"),
            Type::Long     => f.write_str("Long"),
            Type::Float    => f.write_str("Float"),
            Type::Double   => f.write_str("Double"),
            Type::Boolean  => f.write_str("Boolean"),
            Type::Char     => f.write_str("Char"),
            Type::String   => f.write_str("String"),
            Type::Unit     => f.write_str("Unit"),
            Type::Any      => f.write_str("Any"),
            Type::Nothing  => f.write_str("Nothing"),
            Type::Null     => f.write_str("Nothing?"),
            Type::Class(n) => f.write_str(n),
            Type::Array(t) => write!(f, "Array<{t}>"),
            Type::Fn(params, ret) => {
                f.write_str("(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 { f.write_str(", ")?; }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::Error(_) => f.write_str("<error>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtyping_basics() {
        assert!(Type::Int.is_subtype_of(&Type::Int));
        assert!(Type::Int.is_subtype_of(&Type::Any));
        assert!(!Type::Int.is_subtype_of(&Type::Long));
        assert!(Type::Nothing.is_subtype_of(&Type::String));
        assert!(Type::Null.is_subtype_of(&Type::Any));
        assert!(!Type::Null.is_subtype_of(&Type::String));
        assert!(Type::Array(Box::new(Type::Int)).is_subtype_of(&Type::Array(Box::new(Type::Any))));
    }

    #[test]
    fn error_type_is_compatible_both_ways() {
        let err = Type::error("x");
        assert!(err.is_subtype_of(&Type::Int));
        assert!(Type::Int.is_subtype_of(&err));
        assert!(err.is_error());
    }

    #[test]
    fn join_picks_common_supertype() {
        assert_eq!(Type::Int.join(&Type::Int), Type::Int);
        assert_eq!(Type::Nothing.join(&Type::String), Type::String);
        assert_eq!(Type::Int.join(&Type::String), Type::Any);
    }

    #[test]
    fn display_names() {
        assert_eq!(Type::Array(Box::new(Type::String)).to_string(), "Array<String>");
        assert_eq!(Type::Fn(vec![Type::Int, Type::Int], Box::new(Type::Int)).to_string(), "(Int, Int) -> Int");
        assert_eq!(Type::Class("Ann".into()).to_string(), "Ann");
        assert_eq!(Type::error("unresolved").to_string(), "<error>");
    }

    #[test]
    fn builtin_lookup() {
        assert_eq!(Type::builtin("Long"), Some(Type::Long));
        assert_eq!(Type::builtin("Array"), None);
        assert_eq!(Type::builtin("Ann"), None);
    }
}

use std::{collections::HashMap, fmt};

/// A type as written in a declaration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Type {
    Integer,
    Boolean,
    String,
    Char,
    Real,
    Array(Box<ArrayType>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArrayType {
    pub lo: i64,
    pub hi: i64,
    pub elem: Type,
}

impl ArrayType {
    /// Number of elements, or `None` for an empty range.
    pub fn len(&self) -> Option<i64> {
        let len = self.hi.checked_sub(self.lo)?.checked_add(1)?;
        (len > 0).then_some(len)
    }
}

impl Type {
    /// Returns the inferable type this declared type maps to, if any.
    pub fn scalar(&self) -> Option<Scalar> {
        match self {
            Type::Integer => Some(Scalar::Integer),
            Type::Boolean => Some(Scalar::Boolean),
            Type::String => Some(Scalar::String),
            Type::Char | Type::Real | Type::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType> {
        match self {
            Type::Array(array) => Some(array),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Integer => f.write_str("Integer"),
            Type::Boolean => f.write_str("Boolean"),
            Type::String => f.write_str("String"),
            Type::Char => f.write_str("Char"),
            Type::Real => f.write_str("Real"),
            Type::Array(array) => {
                let ArrayType { lo, hi, elem } = &**array;
                write!(f, "array[{lo}..{hi}] of {elem}")
            }
        }
    }
}

/// The closed set of types an expression may infer to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scalar {
    Integer,
    String,
    Boolean,
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Scalar::Integer => "Integer",
            Scalar::String => "String",
            Scalar::Boolean => "Boolean",
        })
    }
}

/// Maps every declared name to its declared type.
///
/// Flat: the last declaration of a name wins, regardless of which routine
/// declared it.
pub type DeclaredTypes = HashMap<Box<str>, Type>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// `None` for procedures.
    pub return_ty: Option<Scalar>,
    pub params: Vec<Scalar>,
}

impl Signature {
    pub fn is_function(&self) -> bool {
        self.return_ty.is_some()
    }
}

pub type SignatureTable = HashMap<Box<str>, Signature>;

/// Per-compilation typing context, threaded through the parser and the code
/// generator.
#[derive(Debug, Default)]
pub struct TypeEnv {
    pub declared: DeclaredTypes,
    pub signatures: SignatureTable,
}

impl TypeEnv {
    pub fn new() -> TypeEnv {
        TypeEnv::default()
    }

    pub fn declared_type(&self, name: &str) -> Option<&Type> {
        self.declared.get(name)
    }

    pub fn signature(&self, name: &str) -> Option<&Signature> {
        self.signatures.get(name)
    }
}

pub mod builtins {
    /// Routines expanded inline by the code generator.
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub enum Builtin {
        Write,
        WriteLn,
        Read,
        ReadLn,
        Length,
    }

    impl Builtin {
        pub const fn name(self) -> &'static str {
            match self {
                Builtin::Write => "write",
                Builtin::WriteLn => "writeln",
                Builtin::Read => "read",
                Builtin::ReadLn => "readln",
                Builtin::Length => "length",
            }
        }
    }

    static BUILTINS: phf::Map<&'static str, Builtin> = phf::phf_map! {
        "write" => Builtin::Write,
        "writeln" => Builtin::WriteLn,
        "read" => Builtin::Read,
        "readln" => Builtin::ReadLn,
        "length" => Builtin::Length,
    };

    /// Expects an already lowercased name.
    pub fn get(name: &str) -> Option<Builtin> {
        BUILTINS.get(name).copied()
    }
}

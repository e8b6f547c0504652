//! Textual method signatures
//!
//! Grammar:
//!
//! ```text
//! signature := "(" [ type { "," type } ] ")" "->" type
//! type      := "(" ")" | "[" type "]" | identifier
//! ```
//!
//! Identifiers are the primitive names (`bool i8 char i16 i32 i64 f32 f64`),
//! `string`, `any`, `type`, or a class name resolved through a
//! [`ClassRegistry`].

use std::fmt;

use crate::registry::ClassRegistry;
use crate::types::{MethodRef, Primitive, TypeInfo};

/// Errors from parsing a signature
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// Input ended inside a signature
    #[error("Unexpected end of signature")]
    UnexpectedEnd,

    /// A specific token was required
    #[error("Expected {expected} at offset {offset}")]
    Expected {
        /// What was required
        expected: &'static str,
        /// Byte offset into the input
        offset: usize,
    },

    /// Identifier is neither a built-in type nor a registered class
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    /// Input continues after a complete signature
    #[error("Unexpected input at offset {0}")]
    TrailingInput(usize),
}

/// Parameter and result types of a method
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    parameters: Vec<TypeInfo>,
    result: TypeInfo,
}

impl MethodSignature {
    /// Create a signature
    pub fn new(parameters: Vec<TypeInfo>, result: TypeInfo) -> Self {
        Self { parameters, result }
    }

    /// Signature of a declared method
    pub fn of(method: &MethodRef) -> Self {
        Self::new(method.parameter_types(), method.return_type())
    }

    /// Parameter types
    pub fn parameters(&self) -> &[TypeInfo] {
        &self.parameters
    }

    /// Result type
    pub fn result(&self) -> &TypeInfo {
        &self.result
    }

    /// Check if `method` has exactly this signature
    pub fn matches(&self, method: &MethodRef) -> bool {
        method.parameter_count() == self.parameters.len()
            && method
                .parameters()
                .iter()
                .zip(&self.parameters)
                .all(|(p, t)| &p.type_info == t)
            && method.return_type() == self.result
    }

    /// Parse the textual form
    pub fn parse(text: &str, registry: &ClassRegistry) -> Result<Self, SignatureError> {
        let mut reader = SignatureReader {
            input: text,
            offset: 0,
            registry,
        };
        let signature = reader.signature()?;
        reader.skip_whitespace();
        if reader.offset < text.len() {
            return Err(SignatureError::TrailingInput(reader.offset));
        }
        Ok(signature)
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", parameter)?;
        }
        write!(f, ") -> {}", self.result)
    }
}

struct SignatureReader<'a> {
    input: &'a str,
    offset: usize,
    registry: &'a ClassRegistry,
}

impl<'a> SignatureReader<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.offset..].chars().next()
    }

    fn bump(&mut self, c: char) {
        self.offset += c.len_utf8();
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.bump(c);
        }
    }

    fn expect(&mut self, token: char, expected: &'static str) -> Result<(), SignatureError> {
        self.skip_whitespace();
        match self.peek() {
            Some(c) if c == token => {
                self.bump(c);
                Ok(())
            }
            Some(_) => Err(SignatureError::Expected {
                expected,
                offset: self.offset,
            }),
            None => Err(SignatureError::UnexpectedEnd),
        }
    }

    fn signature(&mut self) -> Result<MethodSignature, SignatureError> {
        self.expect('(', "'('")?;
        let mut parameters = Vec::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.bump(')');
        } else {
            loop {
                parameters.push(self.type_info()?);
                self.skip_whitespace();
                match self.peek() {
                    Some(',') => self.bump(','),
                    Some(')') => {
                        self.bump(')');
                        break;
                    }
                    Some(_) => {
                        return Err(SignatureError::Expected {
                            expected: "',' or ')'",
                            offset: self.offset,
                        })
                    }
                    None => return Err(SignatureError::UnexpectedEnd),
                }
            }
        }
        self.expect('-', "'->'")?;
        match self.peek() {
            Some('>') => self.bump('>'),
            Some(_) => {
                return Err(SignatureError::Expected {
                    expected: "'->'",
                    offset: self.offset,
                })
            }
            None => return Err(SignatureError::UnexpectedEnd),
        }
        let result = self.type_info()?;
        Ok(MethodSignature::new(parameters, result))
    }

    fn type_info(&mut self) -> Result<TypeInfo, SignatureError> {
        self.skip_whitespace();
        match self.peek() {
            None => Err(SignatureError::UnexpectedEnd),
            Some('(') => {
                self.bump('(');
                self.expect(')', "')'")?;
                Ok(TypeInfo::VOID)
            }
            Some('[') => {
                self.bump('[');
                let element = self.type_info()?;
                self.expect(']', "']'")?;
                Ok(TypeInfo::array_of(element))
            }
            Some(_) => {
                let name = self.identifier();
                if name.is_empty() {
                    return Err(SignatureError::Expected {
                        expected: "a type",
                        offset: self.offset,
                    });
                }
                self.resolve(name)
            }
        }
    }

    fn identifier(&mut self) -> &'a str {
        let start = self.offset;
        while let Some(c) = self.peek() {
            if !(c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | ':')) {
                break;
            }
            self.bump(c);
        }
        &self.input[start..self.offset]
    }

    fn resolve(&self, name: &str) -> Result<TypeInfo, SignatureError> {
        if let Some(primitive) = Primitive::from_name(name) {
            return Ok(TypeInfo::Primitive(primitive));
        }
        match name {
            "string" => Ok(TypeInfo::String),
            "any" => Ok(TypeInfo::Any),
            "type" => Ok(TypeInfo::Type),
            _ => self
                .registry
                .lookup(name)
                .map(TypeInfo::Class)
                .ok_or_else(|| SignatureError::UnknownType(name.to_string())),
        }
    }
}

//! Attribute values.

use uphys_math::{DMat4, DQuat, DVec3};

/// A typed attribute value as authored on a prim.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Token(String),
    String(String),
    Vec3(DVec3),
    /// Stored in glam layout; text sources author `(w, x, y, z)`.
    Quat(DQuat),
    /// Column-vector convention: translation lives in the last column.
    Matrix(DMat4),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    Vec3Array(Vec<DVec3>),
    TokenArray(Vec<String>),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, with integers widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Token or string contents.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Token(s) | Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_vec3(&self) -> Option<DVec3> {
        match self {
            Value::Vec3(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_quat(&self) -> Option<DQuat> {
        match self {
            Value::Quat(q) => Some(*q),
            _ => None,
        }
    }

    pub fn as_matrix(&self) -> Option<DMat4> {
        match self {
            Value::Matrix(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_float_array(&self) -> Option<&[f64]> {
        match self {
            Value::FloatArray(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_vec3_array(&self) -> Option<&[DVec3]> {
        match self {
            Value::Vec3Array(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_token_array(&self) -> Option<&[String]> {
        match self {
            Value::TokenArray(v) => Some(v),
            _ => None,
        }
    }
}

//! Property paths: the names builders use to address model properties.
//!
//! A path is a dot-separated list of property names (`brand.id`) or the
//! wildcard `*`. Column names join the segments with `_`.

use std::fmt;
use std::marker::PhantomData;

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    combinator::{all_consuming, map, recognize},
    multi::separated_list1,
    sequence::pair,
};

use crate::ast::Model;
use crate::error::{RowmapError, RowmapResult};

/// A parsed property path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyPath {
    segments: Vec<String>,
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))(input)
}

fn path(input: &str) -> IResult<&str, Vec<&str>> {
    alt((
        map(tag("*"), |star| vec![star]),
        separated_list1(tag("."), identifier),
    ))(input)
}

impl PropertyPath {
    /// Parse `a.b.c` or `*`.
    pub fn parse(input: &str) -> RowmapResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RowmapError::invalid_path(input, "expression does not read any property"));
        }
        match all_consuming(path)(trimmed) {
            Ok((_, segments)) => Ok(Self {
                segments: segments.into_iter().map(str::to_string).collect(),
            }),
            Err(_) => Err(RowmapError::invalid_path(input, "expected property names separated by '.'")),
        }
    }

    /// The wildcard path `*`.
    pub fn wildcard() -> Self {
        Self {
            segments: vec!["*".to_string()],
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.segments.len() == 1 && self.segments[0] == "*"
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// First segment: the property on the model itself.
    pub fn root(&self) -> &str {
        &self.segments[0]
    }

    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }

    /// Column name: segments joined with `_`.
    pub fn column_name(&self) -> String {
        self.segments.join("_")
    }

    /// Field reference: segments joined with `.`.
    pub fn dotted(&self) -> String {
        self.segments.join(".")
    }

    /// Extend the path with one more property.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// True when `self` is `other` or lies below it.
    pub fn starts_with(&self, other: &PropertyPath) -> bool {
        self.segments.len() >= other.segments.len()
            && self.segments.iter().zip(&other.segments).all(|(a, b)| a == b)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted())
    }
}

/// A property path tied to a model type at compile time.
///
/// ```ignore
/// const NAME: Field<Brand> = Field::new("name");
/// query.projection(|p| p.add(NAME));
/// ```
pub struct Field<M> {
    path: &'static str,
    _model: PhantomData<fn() -> M>,
}

impl<M> Field<M> {
    pub const fn new(path: &'static str) -> Self {
        Self {
            path,
            _model: PhantomData,
        }
    }

    pub const fn path(&self) -> &'static str {
        self.path
    }
}

impl<M> Clone for Field<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M> Copy for Field<M> {}

impl<M: Model> fmt::Debug for Field<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field<{}>({})", M::type_name(), self.path)
    }
}

/// Anything that names a property.
pub trait IntoPath {
    fn into_path(self) -> RowmapResult<PropertyPath>;
}

impl IntoPath for &str {
    fn into_path(self) -> RowmapResult<PropertyPath> {
        PropertyPath::parse(self)
    }
}

impl IntoPath for String {
    fn into_path(self) -> RowmapResult<PropertyPath> {
        PropertyPath::parse(&self)
    }
}

impl IntoPath for &String {
    fn into_path(self) -> RowmapResult<PropertyPath> {
        PropertyPath::parse(self)
    }
}

impl IntoPath for PropertyPath {
    fn into_path(self) -> RowmapResult<PropertyPath> {
        Ok(self)
    }
}

impl IntoPath for &PropertyPath {
    fn into_path(self) -> RowmapResult<PropertyPath> {
        Ok(self.clone())
    }
}

impl<M> IntoPath for Field<M> {
    fn into_path(self) -> RowmapResult<PropertyPath> {
        PropertyPath::parse(self.path)
    }
}

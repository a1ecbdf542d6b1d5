use serde::{Deserialize, Serialize};

/// Logical operator between predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Connective {
    #[default]
    And,
    Or,
}

impl std::fmt::Display for Connective {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Connective::And => write!(f, "AND"),
            Connective::Or => write!(f, "OR"),
        }
    }
}

/// Comparison used by a single predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Eq,
    Like,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Like => "LIKE",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "ASC"),
            SortOrder::Desc => write!(f, "DESC"),
        }
    }
}

/// Join type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum JoinType {
    Inner,
    #[default]
    Left,
    Right,
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JoinType::Inner => write!(f, "INNER JOIN"),
            JoinType::Left => write!(f, "LEFT JOIN"),
            JoinType::Right => write!(f, "RIGHT JOIN"),
        }
    }
}

/// Function wrapped around a projected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Projection {
    Sum,
    Count,
    Avg,
    Round,
    Min,
    Max,
    Cast,
    Distinct,
    Coalesce,
    /// Bare parentheses, used by grouped projections.
    Parenthesis,
}

impl Projection {
    /// Wrap `inner` with this function.
    pub fn wrap(&self, inner: &str) -> String {
        format!("{}({})", self, inner)
    }
}

impl std::fmt::Display for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Projection::Sum => write!(f, "SUM"),
            Projection::Count => write!(f, "COUNT"),
            Projection::Avg => write!(f, "AVG"),
            Projection::Round => write!(f, "ROUND"),
            Projection::Min => write!(f, "MIN"),
            Projection::Max => write!(f, "MAX"),
            Projection::Cast => write!(f, "CAST"),
            Projection::Distinct => write!(f, "DISTINCT"),
            Projection::Coalesce => write!(f, "COALESCE"),
            Projection::Parenthesis => Ok(()),
        }
    }
}

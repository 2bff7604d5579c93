use crate::core::{DbError, Result, SemanticType, Value};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
    /// Between two bounds; each end inclusive unless marked exclusive.
    Range,
}

impl Operator {
    /// The operator that holds after swapping operands (`5 < x` is `x > 5`).
    pub fn flipped(self) -> Self {
        match self {
            Operator::Lt => Operator::Gt,
            Operator::Lte => Operator::Gte,
            Operator::Gt => Operator::Lt,
            Operator::Gte => Operator::Lte,
            other => other,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Range => "RANGE",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Range { lower: Bound<Value>, upper: Bound<Value> },
}

/// One `(attribute, operator, operand)` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub attribute: String,
    pub operator: Operator,
    pub operand: Operand,
}

impl Predicate {
    pub fn new(attribute: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            operand: Operand::Value(value.into()),
        }
    }

    pub fn eq(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, Operator::Eq, value)
    }

    pub fn lt(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, Operator::Lt, value)
    }

    pub fn lte(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, Operator::Lte, value)
    }

    pub fn gt(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, Operator::Gt, value)
    }

    pub fn gte(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(attribute, Operator::Gte, value)
    }

    pub fn range(attribute: impl Into<String>, lower: Bound<Value>, upper: Bound<Value>) -> Self {
        Self {
            attribute: attribute.into(),
            operator: Operator::Range,
            operand: Operand::Range { lower, upper },
        }
    }

    /// Inclusive on both ends.
    pub fn between(attribute: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::range(attribute, Bound::Included(low.into()), Bound::Included(high.into()))
    }

    /// The set of values this predicate accepts, as bounds.
    pub fn bounds(&self) -> Result<(Bound<Value>, Bound<Value>)> {
        match (self.operator, &self.operand) {
            (Operator::Eq, Operand::Value(v)) => Ok((Bound::Included(v.clone()), Bound::Included(v.clone()))),
            (Operator::Lt, Operand::Value(v)) => Ok((Bound::Unbounded, Bound::Excluded(v.clone()))),
            (Operator::Lte, Operand::Value(v)) => Ok((Bound::Unbounded, Bound::Included(v.clone()))),
            (Operator::Gt, Operand::Value(v)) => Ok((Bound::Excluded(v.clone()), Bound::Unbounded)),
            (Operator::Gte, Operand::Value(v)) => Ok((Bound::Included(v.clone()), Bound::Unbounded)),
            (Operator::Range, Operand::Range { lower, upper }) => Ok((lower.clone(), upper.clone())),
            (op, _) => Err(self.malformed(op)),
        }
    }

    /// Copy of the predicate with operands coerced to the attribute type.
    /// NULL operands are rejected: no stored value compares equal to NULL.
    pub(crate) fn coerced(&self, semantic_type: &SemanticType) -> Result<Self> {
        let coerce = |value: &Value| -> Result<Value> {
            let value = semantic_type.coerce(value.clone())?;
            if value.is_null() {
                return Err(DbError::UnsupportedQuery(format!(
                    "NULL operand for '{}'",
                    self.attribute
                )));
            }
            Ok(value)
        };
        let coerce_bound = |bound: &Bound<Value>| -> Result<Bound<Value>> {
            Ok(match bound {
                Bound::Included(v) => Bound::Included(coerce(v)?),
                Bound::Excluded(v) => Bound::Excluded(coerce(v)?),
                Bound::Unbounded => Bound::Unbounded,
            })
        };

        let operand = match (self.operator, &self.operand) {
            (Operator::Range, Operand::Range { lower, upper }) => Operand::Range {
                lower: coerce_bound(lower)?,
                upper: coerce_bound(upper)?,
            },
            (Operator::Range, _) | (_, Operand::Range { .. }) => return Err(self.malformed(self.operator)),
            (_, Operand::Value(v)) => Operand::Value(coerce(v)?),
        };

        Ok(Self {
            attribute: self.attribute.clone(),
            operator: self.operator,
            operand,
        })
    }

    /// Evaluates the predicate against a decoded attribute value.
    /// A NULL attribute never matches.
    pub fn matches(&self, value: &Value) -> Result<bool> {
        if value.is_null() {
            return Ok(false);
        }
        let (lower, upper) = self.bounds()?;
        let above = match &lower {
            Bound::Included(low) => value.compare(low)? != Ordering::Less,
            Bound::Excluded(low) => value.compare(low)? == Ordering::Greater,
            Bound::Unbounded => true,
        };
        if !above {
            return Ok(false);
        }
        Ok(match &upper {
            Bound::Included(high) => value.compare(high)? != Ordering::Greater,
            Bound::Excluded(high) => value.compare(high)? == Ordering::Less,
            Bound::Unbounded => true,
        })
    }

    fn malformed(&self, operator: Operator) -> DbError {
        DbError::UnsupportedQuery(format!(
            "operator {} on '{}' does not fit its operand",
            operator, self.attribute
        ))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Operand::Value(v) => write!(f, "{} {} {}", self.attribute, self.operator, v),
            Operand::Range { lower, upper } => {
                let low = match lower {
                    Bound::Included(v) => format!("[{}", v),
                    Bound::Excluded(v) => format!("({}", v),
                    Bound::Unbounded => "(-inf".to_string(),
                };
                let high = match upper {
                    Bound::Included(v) => format!("{}]", v),
                    Bound::Excluded(v) => format!("{})", v),
                    Bound::Unbounded => "+inf)".to_string(),
                };
                write!(f, "{} IN {}, {}", self.attribute, low, high)
            }
        }
    }
}

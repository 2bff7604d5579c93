pub mod parser;
pub mod predicate;
pub mod translator;

pub use parser::{ParsedQuery, parse_query};
pub use predicate::{Operand, Operator, Predicate};
pub use translator::{Access, QueryPlan, translate};

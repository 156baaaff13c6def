//! Query planner
//!
//! Lowers a validated DSL query into a backend-neutral plan with typed
//! column references and a canonical root alias.
//!
//! ## Pipeline
//!
//! ```text
//! dsl::Query (validated)
//!   → Planner::plan() → QueryPlan
//!   → backend builder → SQL text + params, or a document command
//! ```

pub mod error;
pub mod lower;
pub mod plan;

pub use error::{PlanError, PlanResult};
pub use lower::{Planner, ROOT_ALIAS};
pub use plan::{
    AggregateExpr, AggregateFunc, ColumnRef, FilterExpr, LogicalOp, Pagination, QueryPlan,
    RootModel, SelectExpr, SortExpr, SortTarget,
};

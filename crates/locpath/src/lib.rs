pub mod compiler;
pub mod context;
pub mod data;
pub mod error;
pub mod expr;
pub mod index;
pub mod nodes;
pub mod parser;
pub mod path;

pub use compiler::{Query, compile_query};
pub use context::{
    CompileContext, CompileOptions, CompileOptionsBuilder, EvalContext, EvalContextBuilder,
    StopSignal,
};
pub use data::{Data, MemData, NameId, NodeKind, Pre};
pub use error::{Error, ErrorCode};
pub use expr::{Expr, Value};
pub use index::{IndexKind, IndexQuery, ValueIndex};
pub use nodes::{NodeBuilder, NodeSet};
pub use parser::{LocPathParser, parse_query};
pub use path::{Axis, LocPath, Pred, PredPos, Step, Steps, Test};

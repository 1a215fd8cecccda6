//! Mino semantic front end
//!
//! Builds the class registry from parsed files, checks the program
//! statically, and constructs the per-class dispatch tables the runtime
//! consults. See [`pipeline`] for the phase order.

pub mod checker;
pub mod class_info;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod ids;
pub mod logging;
pub mod members;
pub mod pipeline;
pub mod prelude;
pub mod printer;
pub mod registry;
pub mod scope;
pub mod subtypes;

pub use checker::Ty;
pub use class_info::{
    BuiltinKind, ClassInfo, FieldInfo, MethodInfo, MethodKey, MethodKind, ParamInfo, Primitive,
};
pub use error::{SemanticError, SemanticErrorKind, SemanticResult};
pub use ids::{ClassId, MethodId, ScopeId};
pub use pipeline::{
    analyze, compile_mino_source, FrontendError, MinoPipeline, PipelineOptions, PipelineStats,
    Program,
};
pub use registry::{BuiltinClasses, ClassRegistry};

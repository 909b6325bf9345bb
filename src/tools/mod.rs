// Tool dispatch system
//
// Turns validated tool requests into bounded subprocess runs of the
// external OSINT tools.

pub mod executor;
pub mod implementations;
pub mod registry;
pub mod runner;
pub mod types;

pub use executor::{Dispatcher, CACHE_TTL};
pub use registry::{validate, ParamKind, ParamSpec, ToolCommand, ToolRegistry};
pub use runner::{ExitState, ProcessOutcome, ProcessRunner, SubprocessRunner};
pub use types::{CommandSpec, Params, ToolKind, ToolRequest, ToolResponse};

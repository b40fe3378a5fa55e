pub mod server;

pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod handlers;
pub mod oracle;
pub mod registry;
pub mod routing;

pub use crate::config::{DispatcherConfig, HandlerConfig, HandlerKind, SwitchyardConfig};
pub use crate::conversation::{ConversationStore, Role, Turn};
pub use crate::dispatcher::{DispatchError, DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use crate::error::{CoreError, CoreResult};
pub use crate::handler::{Handler, HandlerDescriptor, HandlerError};
pub use crate::oracle::{LlmOracle, Oracle, OracleError};
pub use crate::registry::Registry;
pub use crate::routing::{RouteSource, RoutingDecision};
pub use crate::server::Server;

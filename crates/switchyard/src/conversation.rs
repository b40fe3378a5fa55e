//! Per-conversation turn history and the locks that serialize it.

pub mod locks;
pub mod store;
pub mod turn;

pub use locks::{ConversationGuard, ConversationLocks};
pub use store::ConversationStore;
pub use turn::{Role, Turn};

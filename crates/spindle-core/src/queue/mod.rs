//! Queue module: task registry + pending queue shared with the worker loop.

mod store;

pub use store::{Claim, Finish, StoreSnapshot, TaskStore};

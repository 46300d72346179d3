//! Tasks and the per-backend Task Store Adapter.

pub mod adapter;
pub mod types;

pub use adapter::TaskStoreAdapter;
pub use types::{NewTask, OwnerId, Task, TaskId, TaskPatch};

//! Public task API: `request`, `config(..).request`, `invalidate`, `pre_process`, `reset`.

mod configured;
mod manager;

pub use configured::{ConfiguredRequest, RequestOptions};
pub use manager::TaskManager;

pub mod refresh;
pub mod refresh_queue;

pub mod dashboard;
pub mod debug;
pub mod task;
pub mod worker;
pub mod ws;

pub use dashboard::create_dashboard_router;
pub use debug::create_debug_router;
pub use task::create_task_router;
pub use worker::create_worker_router;
pub use ws::create_ws_router;

//! Process supervision: spawn the data plane in its own process group,
//! watch its exit channel, respawn on abnormal termination, and coordinate
//! graceful shutdown.

pub mod process;
pub mod watch;

pub use process::{ProcessSupervisor, ProcessSupervisorConfig, SupervisorState};
pub use watch::FileWatcher;

pub mod config;
pub mod controller;
pub mod loop_worker;
pub mod state;

pub use config::MonitorConfig;
pub use controller::MonitorController;
pub use loop_worker::{monitor_loop, FreezeMonitor};
pub use state::{
    classify, FreezeDecision, FreezeState, KoEvent, KoKind, MonitorPhase, MonitorSnapshot,
    TickOutcome,
};

pub mod animation;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod driver;
pub mod listener;
pub mod monitor;
pub mod settings;
pub mod state;
pub mod worker;

pub mod prelude {
    pub use crate::{
        animation::*, config::*, coordinator::*, driver::*, listener::*, monitor::*,
        settings::*, state::*, worker::*, ChargingEvent,
    };
}

/// Everything the charging service reacts to
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChargingEvent {
    /// External power was plugged in, or was already in when we started
    PowerConnected,
    /// External power was removed
    PowerDisconnected,
    /// Settings may have changed
    Refresh,
    /// Another indicator takes over, or gives back, every LED
    AllLed { claim: bool },
    /// The LED device stopped working
    DeviceFault(String),
    /// The service is going away
    Shutdown,
}

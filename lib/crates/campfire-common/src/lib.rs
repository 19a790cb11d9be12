pub mod activation;
pub mod config;
pub mod idle;
pub mod power;
pub mod types;

pub use activation::{
    ActivationError, ActivationGateway, ActivationOutcome, DEFAULT_ACTIVATION_TIMEOUT,
    DenialReason, PowerControl,
};
pub use config::ActivationServerConfig;
pub use idle::{
    IdleMonitor, IdlePolicy, MonitorDecision, SHUTDOWN_PENDING, SHUTDOWN_TAG, ShutdownFlag,
};
pub use power::{PowerSnapshot, PowerStateMachine, TransitionError};
pub use types::*;

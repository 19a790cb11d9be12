use std::sync::Arc;
use std::time::Duration;

use campfire_common::{ActivationGateway, InstanceId, PowerState, PowerStateMachine};

use crate::ec2::Ec2PowerControl;

/// Shared state for all request handlers.
pub struct AppState {
    pub gateway: ActivationGateway<Ec2PowerControl>,
}

impl AppState {
    /// The machine starts out `Stopped`; every activation re-reads the
    /// platform before acting, so the initial guess is corrected on first use.
    #[must_use]
    pub fn new(scope: InstanceId, control: Ec2PowerControl, timeout: Duration) -> Self {
        let machine = Arc::new(PowerStateMachine::new(PowerState::Stopped));
        let gateway = ActivationGateway::new(scope, control, machine)
            .with_timeout(timeout)
            .observing_platform();
        Self { gateway }
    }
}

//! Reactions to events from the two running containers.
//!
//! A backend crash or any process failure tears everything down. A frontend exit
//! is only reported.

use super::launcher::Readiness;
use crate::config::Component;
use crate::error::OpsError;
use crate::process::ProcessEvent;

#[derive(Debug)]
pub enum Reaction {
    Nothing,
    /// Readiness marker seen for the first time.
    Ready(Component),
    /// The process ended without triggering teardown.
    Ended(Component, Option<i32>),
    Teardown(OpsError),
}

#[derive(Debug)]
pub struct Supervisor {
    backend: Readiness,
    frontend: Readiness,
}

impl Default for Supervisor {
    fn default() -> Self {
        Supervisor {
            backend: Readiness::for_component(Component::Backend),
            frontend: Readiness::for_component(Component::Frontend),
        }
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn react(&mut self, component: Component, event: ProcessEvent) -> Reaction {
        match event {
            ProcessEvent::Stdout(line) => {
                let readiness = match component {
                    Component::Backend => &mut self.backend,
                    Component::Frontend => &mut self.frontend,
                };
                if readiness.observe(&line) {
                    Reaction::Ready(component)
                } else {
                    Reaction::Nothing
                }
            }
            ProcessEvent::Stderr(_) => Reaction::Nothing,
            ProcessEvent::Failed(reason) => Reaction::Teardown(OpsError::ProcessFailed {
                component: component.label().to_string(),
                reason,
            }),
            ProcessEvent::Exited(code) => match (component, code) {
                (Component::Backend, Some(0)) => Reaction::Ended(component, code),
                (Component::Backend, code) => Reaction::Teardown(OpsError::BackendExited { code }),
                (Component::Frontend, code) => Reaction::Ended(component, code),
            },
        }
    }
}

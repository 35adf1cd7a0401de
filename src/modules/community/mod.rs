pub mod commands;
pub mod events;

use crate::modules::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "community",
            description: "Rules, invite rewards and AI welcome messages",
        },
        commands: vec![commands::rules(), commands::invitereward()],
        event_handlers: vec![events::handler],
    }
}

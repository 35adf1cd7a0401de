pub mod commands;
pub mod events;

use crate::modules::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "tickets",
            description: "AI-assisted support tickets",
        },
        commands: vec![commands::ticketpanel()],
        event_handlers: vec![events::handler],
    }
}

pub mod commands;

use crate::modules::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "giveaways",
            description: "Timed reaction giveaways",
        },
        commands: vec![commands::giveaway()],
        event_handlers: vec![],
    }
}

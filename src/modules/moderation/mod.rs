pub mod commands;
pub mod events;

use crate::modules::{Module, ModuleDefinition};

pub fn module() -> Module {
    Module {
        definition: ModuleDefinition {
            id: "moderation",
            description: "Warning ledger, automod and staff punishment commands",
        },
        commands: vec![
            commands::ban(),
            commands::unban(),
            commands::revoke(),
            commands::nuke(),
            commands::warnings(),
        ],
        event_handlers: vec![events::handler],
    }
}

pub mod m000001_create_warnings;
pub mod m000002_create_giveaways;
pub mod m000003_create_mod_apps;
pub mod m000004_add_giveaway_first_failure;

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m000001_create_warnings::Migration),
            Box::new(m000002_create_giveaways::Migration),
            Box::new(m000003_create_mod_apps::Migration),
            Box::new(m000004_add_giveaway_first_failure::Migration),
        ]
    }
}

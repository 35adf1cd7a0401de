pub mod giveaways;
pub mod mod_apps;
pub mod warnings;

pub mod ban;
pub mod nuke;
pub mod revoke;
pub mod unban;
pub mod warnings;

pub use ban::*;
pub use nuke::*;
pub use revoke::*;
pub use unban::*;
pub use warnings::*;

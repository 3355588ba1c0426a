//! Wire types shared by the bridge: commands, host declarations, command payloads and
//! response payloads.

mod command;
mod common;
mod host;
mod payloads;
mod responses;

pub use command::*;
pub use common::*;
pub use host::*;
pub use payloads::*;
pub use responses::*;

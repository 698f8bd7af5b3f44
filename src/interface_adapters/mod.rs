// Interface adapters: wire codec, protocol envelope and network handling.

pub mod codec;
pub mod http;
pub mod net;
pub mod protocol;
pub mod state;
pub mod utils;

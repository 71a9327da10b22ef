pub mod buffer;
pub mod channel;
pub mod materialize;
pub mod thumbnail;

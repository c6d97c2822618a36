pub mod simplez80;

pub use simplez80::{FlatBus, SystemSnapshot, Z80System};

pub mod events;
pub mod master;

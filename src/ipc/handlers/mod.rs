pub mod core;
pub mod exits;
pub mod identity;
pub mod page;

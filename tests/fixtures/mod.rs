pub mod persist;
pub mod streets;

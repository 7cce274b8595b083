pub mod magic;
pub mod wol;

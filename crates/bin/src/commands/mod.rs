pub mod invoke;
pub mod set;
pub mod show;

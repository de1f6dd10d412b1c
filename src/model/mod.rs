pub mod constraints;
pub mod objective;
pub mod variables;

pub use variables::VariableSet;

pub mod alphabet;
pub mod identifiers;

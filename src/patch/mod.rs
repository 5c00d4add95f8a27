pub mod assembler;
pub mod grid;

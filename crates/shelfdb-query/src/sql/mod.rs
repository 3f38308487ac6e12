pub mod ast;
pub mod render;

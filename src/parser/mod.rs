pub mod gp5_parser;
pub mod primitive_parser;

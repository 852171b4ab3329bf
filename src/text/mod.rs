pub mod serutils;
pub mod tokenizer;

pub use tokenizer::{Token, TokenType, Tokenizer};

//! HTML scanning and parsing.

pub mod data;
pub mod parser;
pub mod scanner;

pub use parser::{parse, Attribute, AttributeValue, HtmlDocument, Node};
pub use scanner::{Scanner, Token, TokenKind};

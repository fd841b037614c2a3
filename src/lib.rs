//! Grammar-Hive is a stochastic text generator.
//!
//! A grammar is written as a sequence of rule blocks. Each block names one
//! non-terminal and lists its alternatives, one per line, terminated by `;`.
//! Generation starts at `<start>` and repeatedly replaces every non-terminal
//! with one of its alternatives, chosen uniformly at random.
//!
//! # Example
//!
//! ```rust
//! use grammar_hive::compile;
//!
//! let grammar = compile(
//!     "{\n<start>\nhello <name>;\n}\n{\n<name>\nworld;\n}\n",
//! )
//! .unwrap();
//!
//! assert_eq!(grammar.run().unwrap(), "hello world");
//! assert_eq!(grammar.generate_multiple(3).unwrap().len(), 3);
//! ```

pub mod batch;
pub mod grammar;
pub mod utils;

pub use batch::generate_multiple;
pub use grammar::{
    DEFAULT_MAX_DEPTH, ExpansionContext, Grammar, GrammarConfig, Production, Rules, START_SYMBOL,
    Symbol,
};
pub use utils::{GrammarError, Result};

/// Parse and validate grammar text, see [`Grammar::compile`]
pub fn compile(text: &str) -> Result<Grammar> {
    Grammar::compile(text)
}

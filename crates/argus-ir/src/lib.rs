pub mod parse;
pub mod term;

pub use parse::{parse_script, Declaration, Script, ScriptError};
pub use term::{Sort, Term};

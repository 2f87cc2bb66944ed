pub mod session;
pub mod z3_backend;

pub use session::{Model, SatResult, Session, SessionError, Value};
pub use z3_backend::Z3Session;

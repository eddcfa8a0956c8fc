pub mod history;
pub mod parser;
pub mod queue;
pub mod record;
pub mod scope;

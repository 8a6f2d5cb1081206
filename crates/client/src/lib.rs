//! Terminal front-end for tabletop campaigns.
//!
//! Input is read on its own thread and funneled through one bounded queue
//! into the session worker, so commands execute one at a time in the order
//! they were typed.
pub mod logging;
pub mod repl;

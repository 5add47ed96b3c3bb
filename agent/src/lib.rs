//! Confirmation-gated shell assistant.
//!
//! An interactive loop where a language model proposes shell commands and a
//! human explicitly approves each one before it runs. The architecture
//! enforces a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (directory-change resolution,
//!   outcome types, transcript formatting). No I/O, fully testable in
//!   isolation.
//! - **[`io`]**: Side-effecting components (process execution, the stdin
//!   confirmation gate, session state, the chat client). Isolated behind
//!   traits to enable scripted doubles in tests.
//!
//! Orchestration modules compose core logic with I/O: [`tool`] is the
//! confirmation-gated execution facade the model invokes, [`repl`] the
//! conversational loop around it.

pub mod core;
pub mod io;
pub mod logging;
pub mod repl;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod tool;

//! The command interpreter: free-text inbound messages become mailbox
//! operations plus a templated response. `handle` never fails outward —
//! every internal error maps to the internal-error template.

pub mod interpreter;
pub mod notify;
pub mod parse;
pub mod permission;
pub mod templates;

pub use {
    interpreter::{CommandInterpreter, CommandReply},
    notify::RelaySink,
    parse::{Command, parse_command},
    permission::may_reply,
    templates::ResponseKind,
};

/// Controller subsystem - Turns keystrokes and `:` lines into buffer edits
///
/// `Session` owns the mode state machine, the register file and the histories. Keys
/// are mapped to `CommandId`s, the dispatcher composes counts, registers and operators
/// with them, and the handlers in `operations` do the work against a `Buffer`.

pub mod command_table;
pub mod copy;
pub mod dispatcher;
pub mod ex_command;
pub mod ex_run;
pub mod input_line;
pub mod key_handler;
pub mod mode;
pub mod operations;
pub mod session;
pub mod state;

// Re-export public interface
pub use command_table::{CommandFlags, CommandId};
pub use ex_command::{
    ExCommand, ExCommandDetail, ExContext, ExName, LineRange, SubstituteFlags, Substitution,
};
pub use input_line::{History, InputEvent, InputLine};
pub use key_handler::command_for_key;
pub use mode::{CopyMode, Mode, Operator, VisualMode};
pub use session::{CommandHandler, HostRequest, STATUS_TIMEOUT_MS, Session, SessionBuilder};

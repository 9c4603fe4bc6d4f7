mod command_input;

pub use command_input::{CommandEvent, CommandInput};

/// What a component did with a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing for the parent to do
  Handled,
  /// Consumed, with an event for the parent
  Event(T),
  /// Not consumed, parent should try next handler
  NotHandled,
}

//! Command registry.
//!
//! Commands are named callbacks. Each may carry a completion callback that
//! is consulted when Tab is pressed past the first word of a line naming the
//! command.

use crate::complete::Candidates;
use crate::error::{CliError, Result};
use crate::session::Session;
use std::collections::BTreeMap;
use std::rc::Rc;

/// What the loop should do after a callback returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    /// Leave [`Session::run`].
    Exit,
}

/// Arguments handed to a command callback.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    /// The text the words were split from (after alias expansion).
    pub line: &'a str,
    /// The words of the command. `args[0]` is the name the callback was
    /// reached by: the command itself, or the matched node of a command
    /// table.
    pub args: &'a [String],
    /// For table commands, the words consumed walking down to the matched
    /// node (not including `args[0]`). Empty for flat commands.
    pub path: &'a [String],
}

impl<'a> Invocation<'a> {
    pub fn new(line: &'a str, args: &'a [String]) -> Self {
        Self {
            line,
            args,
            path: &[],
        }
    }

    /// The command name (`args[0]`), or "" for an empty line.
    pub fn name(&self) -> &'a str {
        self.args.first().map(String::as_str).unwrap_or("")
    }

    /// Argument `i`, where 0 is the command name.
    pub fn arg(&self, i: usize) -> Option<&'a str> {
        self.args.get(i).map(String::as_str)
    }

    /// Number of words including the name.
    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Context handed to a completion callback.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
    /// The command the completion is for. `None` for the default
    /// completion.
    pub command: Option<&'a str>,
    /// Raw text of the command up to the cursor, quotes and trailing
    /// whitespace included. With a command delimiter configured this is
    /// only the last command of the line.
    pub line: &'a str,
    /// Words of the line up to the cursor. When the cursor follows
    /// whitespace the word being completed is not among them yet.
    pub words: &'a [String],
    /// Index of the word being completed.
    pub word: usize,
    /// The partial word under the cursor ("" after whitespace).
    pub current: &'a str,
}

pub type CommandFn = Rc<dyn Fn(&mut Session, &Invocation<'_>) -> Flow>;

pub type CompletionFn =
    Rc<dyn Fn(&Session, &CompletionRequest<'_>, &mut Candidates) -> Result<()>>;

/// Called with the line as it was when Ctrl-C was pressed and the cursor
/// position.
pub type InterruptFn = Rc<dyn Fn(&mut Session, &str, usize) -> Flow>;

#[derive(Clone)]
pub struct Command {
    pub(crate) callback: CommandFn,
    pub(crate) completion: Option<CompletionFn>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("completion", &self.completion.is_some())
            .finish_non_exhaustive()
    }
}

/// Registered commands, kept sorted by name.
#[derive(Debug, Clone, Default)]
pub struct Commands {
    map: BTreeMap<String, Command>,
}

impl Commands {
    /// Add or replace a command. Replacing keeps no completion.
    pub fn insert(&mut self, name: &str, callback: CommandFn) -> Result<()> {
        validate_name(name)?;
        self.map.insert(
            name.to_string(),
            Command {
                callback,
                completion: None,
            },
        );
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<()> {
        self.map
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| CliError::NotFound(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Command> {
        self.map.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    pub fn set_completion(&mut self, name: &str, completion: CompletionFn) -> Result<()> {
        let command = self
            .map
            .get_mut(name)
            .ok_or_else(|| CliError::NotFound(name.to_string()))?;
        command.completion = Some(completion);
        Ok(())
    }

    /// Command names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Command, alias and table node names must be non-empty single words.
pub(crate) fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CliError::InvalidInput("empty name".to_string()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(CliError::InvalidInput(format!(
            "name contains whitespace: {name:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> CommandFn {
        Rc::new(|_: &mut Session, _: &Invocation<'_>| Flow::Continue)
    }

    #[test]
    fn test_insert_replaces_and_sorts() {
        let mut commands = Commands::default();
        commands.insert("show", noop()).unwrap();
        commands.insert("exit", noop()).unwrap();
        commands.insert("shell", noop()).unwrap();
        commands.insert("show", noop()).unwrap();

        assert_eq!(commands.len(), 3);
        assert_eq!(commands.names().collect::<Vec<_>>(), ["exit", "shell", "show"]);
    }

    #[test]
    fn test_rejects_bad_names() {
        let mut commands = Commands::default();
        assert!(matches!(
            commands.insert("", noop()),
            Err(CliError::InvalidInput(_))
        ));
        assert!(matches!(
            commands.insert("two words", noop()),
            Err(CliError::InvalidInput(_))
        ));
        assert!(commands.is_empty());
    }

    #[test]
    fn test_remove_and_completion_need_existing_command() {
        let mut commands = Commands::default();
        assert!(matches!(commands.remove("nope"), Err(CliError::NotFound(_))));

        let completion: CompletionFn =
            Rc::new(|_: &Session, _: &CompletionRequest<'_>, _: &mut Candidates| Ok(()));
        assert!(matches!(
            commands.set_completion("nope", completion.clone()),
            Err(CliError::NotFound(_))
        ));

        commands.insert("run", noop()).unwrap();
        commands.set_completion("run", completion).unwrap();
        assert!(commands.get("run").unwrap().completion.is_some());

        // Re-registering drops the completion
        commands.insert("run", noop()).unwrap();
        assert!(commands.get("run").unwrap().completion.is_none());

        commands.remove("run").unwrap();
        assert!(!commands.contains("run"));
    }

    #[test]
    fn test_invocation_accessors() {
        let args = vec!["history".to_string(), "5".to_string()];
        let inv = Invocation::new("history 5", &args);
        assert_eq!(inv.name(), "history");
        assert_eq!(inv.arg(1), Some("5"));
        assert_eq!(inv.arg(2), None);
        assert_eq!(inv.len(), 2);
        assert!(inv.path.is_empty());

        let empty = Invocation::new("", &[]);
        assert_eq!(empty.name(), "");
        assert!(empty.is_empty());
    }
}

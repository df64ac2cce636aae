//! Hierarchical command and completion tables.
//!
//! A table is a tree whose unnamed root holds the top-level commands. Each
//! top-level node is registered as an ordinary command whose callback walks
//! the words of the line down the tree:
//!
//! ```text
//! show            (usage: show {commands|history})
//! ├── commands    -> callback(["commands", ...])
//! └── history     -> callback(["history", ...])
//! ```
//!
//! The deepest node whose name matches the next word wins. Its callback
//! receives the words starting at its own name; the words consumed on the
//! way down are available as [`Invocation::path`]. A node without a callback
//! prints a usage line listing its children.
//!
//! Completion tables have the same shape. Completing a word directly below
//! a node offers the node's child names plus whatever its completion
//! callback adds; deeper words are left to the callback alone.

use crate::command::{
    CommandFn, CompletionFn, CompletionRequest, Flow, Invocation, validate_name,
};
use crate::complete::Candidates;
use crate::error::{CliError, Result};
use crate::session::Session;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::rc::Rc;

/// Deepest nesting accepted below the root.
pub const MAX_TABLE_DEPTH: usize = 32;

/// A node of a command table.
#[derive(Clone, Default)]
pub struct CommandTable {
    pub name: Option<String>,
    pub callback: Option<CommandFn>,
    pub children: Vec<CommandTable>,
}

impl CommandTable {
    /// The unnamed root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&mut Session, &Invocation<'_>) -> Flow + 'static,
    {
        self.callback = Some(Rc::new(callback));
        self
    }

    pub fn with_child(mut self, child: CommandTable) -> Self {
        self.children.push(child);
        self
    }

    fn child(&self, name: &str) -> Option<&CommandTable> {
        self.children
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandTable")
            .field("name", &self.name)
            .field("callback", &self.callback.is_some())
            .field("children", &self.children)
            .finish()
    }
}

/// A node of a completion table.
#[derive(Clone, Default)]
pub struct CompletionTable {
    pub name: Option<String>,
    pub completion: Option<CompletionFn>,
    pub children: Vec<CompletionTable>,
}

impl CompletionTable {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_completion<F>(mut self, completion: F) -> Self
    where
        F: Fn(&Session, &CompletionRequest<'_>, &mut Candidates) -> Result<()> + 'static,
    {
        self.completion = Some(Rc::new(completion));
        self
    }

    pub fn with_child(mut self, child: CompletionTable) -> Self {
        self.children.push(child);
        self
    }

    fn child(&self, name: &str) -> Option<&CompletionTable> {
        self.children
            .iter()
            .find(|c| c.name.as_deref() == Some(name))
    }
}

impl std::fmt::Debug for CompletionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionTable")
            .field("name", &self.name)
            .field("completion", &self.completion.is_some())
            .field("children", &self.children)
            .finish()
    }
}

/// Shape shared by both table kinds, for validation.
trait TableNode: Sized {
    fn node_name(&self) -> Option<&str>;
    fn node_children(&self) -> &[Self];
    /// Extra per-node checks.
    fn check(&self, _path: &str) -> Result<()> {
        Ok(())
    }
}

impl TableNode for CommandTable {
    fn node_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn node_children(&self) -> &[Self] {
        &self.children
    }

    fn check(&self, path: &str) -> Result<()> {
        if self.callback.is_none() && self.children.is_empty() {
            return Err(CliError::MalformedTable(format!(
                "{path}: leaf has no callback"
            )));
        }
        Ok(())
    }
}

impl TableNode for CompletionTable {
    fn node_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn node_children(&self) -> &[Self] {
        &self.children
    }
}

/// Check the whole tree below `root` before anything is registered.
fn validate<T: TableNode>(root: &T) -> Result<()> {
    if root.node_children().is_empty() {
        return Err(CliError::MalformedTable("table has no commands".to_string()));
    }
    validate_children(root, "table", 1)
}

fn validate_children<T: TableNode>(node: &T, path: &str, depth: usize) -> Result<()> {
    if node.node_children().is_empty() {
        return Ok(());
    }
    if depth > MAX_TABLE_DEPTH {
        return Err(CliError::MalformedTable(format!(
            "{path}: nested deeper than {MAX_TABLE_DEPTH}"
        )));
    }

    let mut seen = HashSet::new();
    for child in node.node_children() {
        let Some(name) = child.node_name() else {
            return Err(CliError::MalformedTable(format!("{path}: unnamed entry")));
        };
        validate_name(name).map_err(|e| CliError::MalformedTable(format!("{path}: {e}")))?;
        if !seen.insert(name) {
            return Err(CliError::MalformedTable(format!(
                "{path}: duplicate entry {name:?}"
            )));
        }

        let child_path = if depth == 1 {
            name.to_string()
        } else {
            format!("{path} {name}")
        };
        child.check(&child_path)?;
        validate_children(child, &child_path, depth + 1)?;
    }
    Ok(())
}

/// Walk `args` (where `args[0]` names `top`) down the tree and run the
/// deepest matching node.
fn dispatch(top: &CommandTable, session: &mut Session, inv: &Invocation<'_>) -> Flow {
    let args = inv.args;
    let mut node = top;
    let mut depth = 0;
    while let Some(word) = args.get(depth + 1)
        && let Some(child) = node.child(word)
    {
        node = child;
        depth += 1;
    }

    tracing::trace!(command = inv.name(), depth, "table dispatch");

    match &node.callback {
        Some(callback) => {
            let callback = Rc::clone(callback);
            let nested = Invocation {
                line: inv.line,
                args: &args[depth..],
                path: &args[..depth],
            };
            callback(session, &nested)
        }
        None => {
            let choices: Vec<&str> = node
                .children
                .iter()
                .filter_map(|c| c.name.as_deref())
                .collect();
            let _ = writeln!(
                session,
                "usage: {} {{{}}}",
                args[..=depth].join(" "),
                choices.join("|")
            );
            Flow::Continue
        }
    }
}

/// Complete below `top`, whose name is `req.words[0]`.
fn complete(
    top: &CompletionTable,
    session: &Session,
    req: &CompletionRequest<'_>,
    candidates: &mut Candidates,
) -> Result<()> {
    let mut node = top;
    let mut depth = 0;
    while depth + 1 < req.word
        && let Some(word) = req.words.get(depth + 1)
        && let Some(child) = node.child(word)
    {
        node = child;
        depth += 1;
    }

    if depth + 1 == req.word {
        for name in node.children.iter().filter_map(|c| c.name.as_deref()) {
            candidates.push(name)?;
        }
    }

    if let Some(completion) = &node.completion {
        let nested = CompletionRequest {
            command: node.name.as_deref(),
            line: req.line,
            words: req.words.get(depth..).unwrap_or_default(),
            word: req.word - depth,
            current: req.current,
        };
        completion(session, &nested, candidates)?;
    }
    Ok(())
}

impl Session {
    /// Register every top-level entry of `root` as a command dispatching
    /// through the table.
    ///
    /// The table is validated first; on error nothing is registered.
    pub fn register_command_table(&mut self, root: CommandTable) -> Result<()> {
        validate(&root)?;

        for top in root.children {
            let Some(name) = top.name.clone() else {
                continue;
            };
            let top = Rc::new(top);
            let callback: CommandFn =
                Rc::new(move |session: &mut Session, inv: &Invocation<'_>| {
                    dispatch(&top, session, inv)
                });
            self.commands.insert(&name, callback)?;
        }
        Ok(())
    }

    /// Attach completion from `root` to the already registered commands it
    /// names.
    ///
    /// Fails with [`CliError::NotFound`] if any top-level entry is not a
    /// registered command; nothing is attached in that case.
    pub fn register_completion_table(&mut self, root: CompletionTable) -> Result<()> {
        validate(&root)?;

        for top in &root.children {
            if let Some(name) = top.name.as_deref()
                && !self.commands.contains(name)
            {
                return Err(CliError::NotFound(name.to_string()));
            }
        }

        for top in root.children {
            let Some(name) = top.name.clone() else {
                continue;
            };
            let top = Rc::new(top);
            let completion: CompletionFn = Rc::new(
                move |session: &Session,
                      req: &CompletionRequest<'_>,
                      candidates: &mut Candidates| {
                    complete(&top, session, req, candidates)
                },
            );
            self.commands.set_completion(&name, completion)?;
        }
        Ok(())
    }
}

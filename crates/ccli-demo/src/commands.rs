//! Commands of the demo shell

use ccli::{
    Candidates, CommandTable, CompletionRequest, CompletionTable, Flow, Invocation, Session,
};
use std::fmt::Write as _;

/// Register every demo command on `session`.
pub fn register(session: &mut Session) -> ccli::Result<()> {
    session.register_command("echo", echo)?;
    session.register_command("history", history)?;
    session.register_command("alias", alias)?;
    session.register_command("unalias", unalias)?;
    session.register_completion("unalias", complete_alias_names)?;
    session.register_completion("alias", complete_alias_names)?;
    session.register_default_completion(complete_files);

    session.register_command_table(
        CommandTable::root().with_child(
            CommandTable::new("show")
                .with_child(CommandTable::new("commands").with_callback(show_commands))
                .with_child(CommandTable::new("history").with_callback(history))
                .with_child(CommandTable::new("aliases").with_callback(show_aliases)),
        ),
    )?;
    session.register_completion_table(
        CompletionTable::root().with_child(
            CompletionTable::new("show")
                .with_child(CompletionTable::new("commands"))
                .with_child(CompletionTable::new("history"))
                .with_child(CompletionTable::new("aliases")),
        ),
    )?;
    Ok(())
}

fn echo(s: &mut Session, inv: &Invocation<'_>) -> Flow {
    let text = inv.args.get(1..).unwrap_or_default().join(" ");
    let _ = writeln!(s, "{text}");
    Flow::Continue
}

/// `history` lists everything; `history N` shows the line N entries back.
fn history(s: &mut Session, inv: &Invocation<'_>) -> Flow {
    let Some(arg) = inv.arg(1) else {
        let lines: Vec<String> = s.history_iter().map(str::to_string).collect();
        let total = lines.len();
        for (i, line) in lines.iter().enumerate() {
            let _ = writeln!(s, "{:5}  {line}", total - i);
        }
        return Flow::Continue;
    };

    let Ok(age) = arg.parse::<usize>() else {
        let _ = writeln!(s, "usage: {} [number]", inv.name());
        return Flow::Continue;
    };
    match s.history(age).map(str::to_string) {
        Some(line) => {
            let _ = writeln!(s, "History {age} ago: {line}");
        }
        None => {
            let _ = writeln!(s, "No history at {age}");
        }
    }
    Flow::Continue
}

/// `alias` lists, `alias name=value` defines, `alias name` shows one.
fn alias(s: &mut Session, inv: &Invocation<'_>) -> Flow {
    if inv.len() < 2 {
        return show_aliases(s, inv);
    }

    for word in &inv.args[1..] {
        match word.split_once('=') {
            Some((name, value)) => {
                if let Err(e) = s.register_alias(name, value) {
                    let _ = writeln!(s, "alias {name}: {e}");
                }
            }
            None => match s.aliases().get(word).map(str::to_string) {
                Some(value) => {
                    let _ = writeln!(s, "alias {word}={value}");
                }
                None => {
                    let _ = writeln!(s, "alias {word}: not found");
                }
            },
        }
    }
    Flow::Continue
}

fn unalias(s: &mut Session, inv: &Invocation<'_>) -> Flow {
    if inv.len() < 2 {
        let _ = writeln!(s, "unalias: usage: unalias name [name ...]");
        return Flow::Continue;
    }
    for name in &inv.args[1..] {
        if s.unregister_alias(name).is_err() {
            let _ = writeln!(s, "unalias {name}: not found");
        }
    }
    Flow::Continue
}

fn show_aliases(s: &mut Session, _: &Invocation<'_>) -> Flow {
    let aliases: Vec<(String, String)> = s
        .aliases()
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    for (name, value) in aliases {
        let _ = writeln!(s, "alias {name}='{value}'");
    }
    Flow::Continue
}

fn show_commands(s: &mut Session, _: &Invocation<'_>) -> Flow {
    let names: Vec<String> = s.command_names().map(str::to_string).collect();
    for name in names {
        let _ = writeln!(s, "{name}");
    }
    Flow::Continue
}

fn complete_alias_names(
    s: &Session,
    req: &CompletionRequest<'_>,
    candidates: &mut Candidates,
) -> ccli::Result<()> {
    if req.word > 0 {
        candidates.extend(s.aliases().names())?;
    }
    Ok(())
}

/// Arguments of commands without their own completion are paths.
fn complete_files(
    _: &Session,
    req: &CompletionRequest<'_>,
    candidates: &mut Candidates,
) -> ccli::Result<()> {
    if req.word > 0 {
        candidates.files(req.current)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccli::ScriptedConsole;

    fn run(input: &str) -> String {
        let console = ScriptedConsole::new(input);
        let transcript = console.transcript();
        let mut session = Session::new(console, "demo> ").unwrap();
        register(&mut session).unwrap();
        session.run().unwrap();
        transcript.text()
    }

    #[test]
    fn test_echo() {
        assert!(run("echo 'a  b' c\n").contains("a  b c\n"));
    }

    #[test]
    fn test_alias_commands() {
        let out = run("alias ll='echo long'\nll x\nalias ll\nalias\nunalias ll\nunalias ll\nunalias\n");
        assert!(out.contains("long x\n"));
        assert!(out.contains("alias ll=echo long\n"));
        assert!(out.contains("alias ll='echo long'\n"));
        assert!(out.contains("unalias ll: not found\n"));
        assert!(out.contains("unalias: usage: unalias name [name ...]\n"));
    }

    #[test]
    fn test_alias_not_found() {
        assert!(run("alias nope\n").contains("alias nope: not found\n"));
    }

    #[test]
    fn test_history_command() {
        let out = run("echo one\necho two\nhistory 2\nhistory 9\nhistory\n");
        assert!(out.contains("History 2 ago: echo one\n"));
        assert!(out.contains("No history at 9\n"));
        assert!(out.contains("    4  echo one\n"));
        assert!(out.contains("    1  history 9\n"));
    }

    #[test]
    fn test_echo_completes_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("unique-subdir")).unwrap();
        let root = dir.path().to_str().unwrap();

        let out = run(&format!("echo {root}/uniq\t\n"));

        assert!(out.contains(&format!("{root}/unique-subdir/\n")));
    }

    #[test]
    fn test_show_table() {
        let out = run("show commands\nshow\nsh\tal\t\n");
        assert!(out.contains("alias\necho\nexit\nhistory\nshow\nunalias\n"));
        assert!(out.contains("usage: show {commands|history|aliases}\n"));
    }
}

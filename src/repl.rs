//! Line commands typed at the gdbfront prompt.

/// A parsed prompt line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    /// Blank line.
    Empty,
    /// `run`: launch locally, or remotely when a target is configured.
    Run,
    /// `target HOST:PORT`
    Target(String),
    /// `break LOCATION`
    Break(String),
    /// `delete NUMBER`
    Delete(i32),
    Continue,
    Next,
    Step,
    Finish,
    Interrupt,
    /// `bt`: list stack frames.
    Backtrace,
    Locals,
    Threads,
    /// `info`: print a session snapshot.
    Status,
    Help,
    Quit,
    /// A line starting with `-`, sent as a tracked MI command.
    Mi(String),
    /// Anything else, passed through untracked.
    Raw(String),
}

/// Parse one prompt line.
///
/// # Errors
///
/// Returns a usage message when a known command is missing its argument.
pub fn parse(line: &str) -> Result<ReplCommand, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ReplCommand::Empty);
    }
    if line.starts_with('-') {
        return Ok(ReplCommand::Mi(line.to_string()));
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let cmd = match word {
        "run" | "r" => ReplCommand::Run,
        "target" => ReplCommand::Target(required(rest, "target HOST:PORT")?),
        "break" | "b" => ReplCommand::Break(required(rest, "break LOCATION")?),
        "delete" | "d" => {
            let number = required(rest, "delete NUMBER")?;
            let number = number
                .parse()
                .map_err(|_| format!("not a breakpoint number: {number}"))?;
            ReplCommand::Delete(number)
        }
        "continue" | "c" => ReplCommand::Continue,
        "next" | "n" => ReplCommand::Next,
        "step" | "s" => ReplCommand::Step,
        "finish" => ReplCommand::Finish,
        "interrupt" => ReplCommand::Interrupt,
        "bt" | "backtrace" => ReplCommand::Backtrace,
        "locals" => ReplCommand::Locals,
        "threads" => ReplCommand::Threads,
        "info" => ReplCommand::Status,
        "help" | "?" => ReplCommand::Help,
        "quit" | "q" => ReplCommand::Quit,
        _ => ReplCommand::Raw(line.to_string()),
    };
    Ok(cmd)
}

fn required(rest: &str, usage: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(rest.to_string())
    }
}

pub const HELP: &str = "\
commands:
  run | r                 start the program (remote when a target is configured)
  target HOST:PORT        connect to a remote target
  break | b LOCATION      insert a breakpoint
  delete | d NUMBER       remove a breakpoint
  continue | c            resume execution
  next | n, step | s      step over / into
  finish                  run until the current frame returns
  interrupt               stop the running program
  bt, locals, threads     refresh stack, locals or threads
  info                    print the session state
  -<mi command>           send an MI command and print its result
  quit | q                exit
anything else is passed to the debugger unchanged";

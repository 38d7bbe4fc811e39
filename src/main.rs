mod printer;
mod repl;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use gdbfront_config::discover::{find_debuggers, read_init_script};
use gdbfront_config::templates::{default_template, load_templates};
use gdbfront_config::{load_config, load_file, Config, DefaultPaths, PlatformPaths, Template};
use gdbfront_session::{DebugEvent, DebugManager, Response, Retention, SessionError};

use repl::ReplCommand;

const USAGE: &str = "\
usage: gdbfront [options] [EXECUTABLE]

options:
  -c, --config FILE      use FILE instead of the global and project configs
  -t, --template NAME    apply the named init-script template
  -r, --remote TARGET    connect to TARGET (host:port) on `run`
      --list             list GDB binaries on PATH and known templates
  -h, --help             show this message";

/// Parsed command line.
#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<PathBuf>,
    template: Option<String>,
    remote: Option<String>,
    list: bool,
    help: bool,
    executable: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-c" | "--config" => parsed.config = Some(PathBuf::from(option_value(&mut args, &arg)?)),
            "-t" | "--template" => parsed.template = Some(option_value(&mut args, &arg)?),
            "-r" | "--remote" => parsed.remote = Some(option_value(&mut args, &arg)?),
            "--list" => parsed.list = true,
            "-h" | "--help" => parsed.help = true,
            flag if flag.starts_with('-') => bail!("unknown option: {flag}"),
            _ if parsed.executable.is_none() => parsed.executable = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument: {arg}"),
        }
    }
    Ok(parsed)
}

fn option_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    args.next().with_context(|| format!("{flag} needs a value"))
}

fn main() {
    let result = parse_args(env::args().skip(1)).and_then(run);
    if let Err(e) = result {
        eprintln!("gdbfront: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    if args.help {
        println!("{USAGE}");
        return Ok(());
    }

    let paths = DefaultPaths::new().context("failed to detect platform paths")?;
    if args.list {
        list_debuggers(&paths);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => load_file(path).with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let project_dir = env::current_dir().ok();
            load_config(&paths.config_dir(), project_dir.as_deref()).unwrap_or_else(|e| {
                eprintln!("gdbfront: config error, using defaults: {e}");
                Config::default()
            })
        }
    };

    init_logging(&paths, &config);
    info!("gdbfront starting, debugger: {}", config.debugger.command);

    apply_template(&mut config, &paths, args.template.as_deref())?;
    if let Some(remote) = args.remote {
        config.launch.remote_target = Some(remote);
    }
    if let Some(exe) = args.executable {
        if config.launch.init_script.is_empty() {
            config.launch.init_script = read_init_script(&exe)
                .with_context(|| format!("failed to read init script next to {}", exe.display()))?;
        }
        config.launch.executable = Some(exe);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    runtime.block_on(interactive(config))
}

fn init_logging(paths: &DefaultPaths, config: &Config) {
    let log_path = config.log.file.clone().unwrap_or_else(|| paths.log_dir().join("gdbfront.log"));
    if let Some(dir) = log_path.parent() {
        std::fs::create_dir_all(dir).ok();
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log.level.as_filter()));

    match std::fs::OpenOptions::new().create(true).append(true).open(&log_path) {
        Ok(log_file) => tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(log_file))
            .with_ansi(false)
            .with_env_filter(env_filter)
            .init(),
        Err(e) => eprintln!("gdbfront: cannot open log {}: {e}", log_path.display()),
    }
}

fn list_debuggers(paths: &DefaultPaths) {
    let debuggers = find_debuggers();
    if debuggers.is_empty() {
        println!("no GDB binaries found on PATH");
    }
    for path in &debuggers {
        println!("{}", path.display());
    }

    let templates = load_templates(&paths.template_dirs());
    let default = default_template(&templates).map(|t| t.name.clone());
    for template in &templates {
        let marker = if Some(&template.name) == default.as_ref() { '*' } else { ' ' };
        let gdb = template
            .pick_debugger(&debuggers)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{marker} {} ({} commands, gdb: {gdb})", template.name, template.commands.len());
    }
}

/// Apply the named template, or the default one when the config has no
/// init script of its own.
fn apply_template(config: &mut Config, paths: &DefaultPaths, name: Option<&str>) -> Result<()> {
    let templates = load_templates(&paths.template_dirs());
    let template: &Template = match name {
        Some(name) => match templates.iter().find(|t| t.name == name) {
            Some(t) => t,
            None => bail!("no template named {name:?}"),
        },
        None if config.launch.init_script.is_empty() => match default_template(&templates) {
            Some(t) => t,
            None => return Ok(()),
        },
        None => return Ok(()),
    };

    info!("applying template {:?}", template.name);
    config.launch.init_script = template.init_script();
    if template.preferred_gdb.is_some() {
        match template.pick_debugger(&find_debuggers()) {
            Some(gdb) => config.debugger.command = gdb.to_string_lossy().into_owned(),
            None => warn!("template {:?}: no matching debugger on PATH", template.name),
        }
    }
    Ok(())
}

async fn interactive(config: Config) -> Result<()> {
    let remote = config.launch.remote_target.clone();
    let grace = Duration::from_millis(config.session.quit_grace_ms) + Duration::from_secs(1);
    let manager = DebugManager::new(config);

    let (exited_tx, mut exited_rx) = oneshot::channel();
    let printer = tokio::spawn(print_events(manager.subscribe(), exited_tx));

    manager.start().await.context("failed to start debugger")?;
    println!("type `help` for commands");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = &mut exited_rx => {
                info!("debugger went away");
                return Ok(());
            }
        };
        let Some(line) = line else { break };

        let cmd = match repl::parse(&line) {
            Ok(cmd) => cmd,
            Err(usage) => {
                eprintln!("{usage}");
                continue;
            }
        };
        match cmd {
            ReplCommand::Quit => break,
            ReplCommand::Help => println!("{}", repl::HELP),
            cmd => match dispatch(&manager, cmd, remote.as_deref()).await {
                Ok(()) => {}
                Err(SessionError::SessionTerminated) => break,
                Err(e) => eprintln!("error: {e}"),
            },
        }
    }

    match manager.quit().await {
        Ok(()) | Err(SessionError::SessionTerminated) => {}
        Err(e) => warn!("quit failed: {e}"),
    }
    if tokio::time::timeout(grace, printer).await.is_err() {
        warn!("debugger exit not observed");
    }
    Ok(())
}

async fn dispatch(
    manager: &DebugManager,
    cmd: ReplCommand,
    remote: Option<&str>,
) -> Result<(), SessionError> {
    match cmd {
        ReplCommand::Empty | ReplCommand::Help | ReplCommand::Quit => {}
        ReplCommand::Run => {
            match remote {
                Some(target) => manager.launch_remote(target).await?,
                None => manager.launch_local().await?,
            };
        }
        ReplCommand::Target(target) => {
            manager.launch_remote(target).await?;
        }
        ReplCommand::Break(location) => {
            manager.break_insert(location).await?;
        }
        ReplCommand::Delete(number) => {
            manager.break_remove(number).await?;
        }
        ReplCommand::Continue => {
            manager.command_continue().await?;
        }
        ReplCommand::Next => {
            manager.command_next().await?;
        }
        ReplCommand::Step => {
            manager.command_step().await?;
        }
        ReplCommand::Finish => {
            manager.command_finish().await?;
        }
        ReplCommand::Interrupt => manager.command_interrupt().await?,
        ReplCommand::Backtrace => {
            manager.stack_list_frames().await?;
        }
        ReplCommand::Locals => {
            manager.stack_list_locals().await?;
        }
        ReplCommand::Threads => {
            manager.thread_info().await?;
        }
        ReplCommand::Status => {
            let snap = manager.snapshot().await?;
            println!("{}", printer::format_snapshot(&snap));
        }
        ReplCommand::Mi(text) => {
            let token = manager
                .command_and_response(
                    text,
                    Box::new(|r: &Response| debug!("result {:?}: {:?}", r.token, r.status)),
                    Retention::Temporal,
                )
                .await?;
            debug!("sent tracked command {token}");
        }
        ReplCommand::Raw(text) => manager.command(text).await?,
    }
    Ok(())
}

/// Print events until the debugger process exits.
async fn print_events(mut events: broadcast::Receiver<DebugEvent>, exited: oneshot::Sender<()>) {
    loop {
        match events.recv().await {
            Ok(event) => {
                if let Some(text) = printer::format_event(&event) {
                    println!("{text}");
                }
                if matches!(event, DebugEvent::ProcessTerminated { .. }) {
                    let _ = exited.send(());
                    return;
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => warn!("event printer skipped {n} events"),
            Err(broadcast::error::RecvError::Closed) => {
                error!("event stream closed");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Result<Args> {
        parse_args(list.iter().map(|s| s.to_string()))
    }

    #[test]
    fn parses_options_and_executable() {
        let parsed = args(&["-c", "dbg.toml", "--remote", "board:3333", "build/fw.elf"]).unwrap();
        assert_eq!(parsed.config, Some(PathBuf::from("dbg.toml")));
        assert_eq!(parsed.remote.as_deref(), Some("board:3333"));
        assert_eq!(parsed.executable, Some(PathBuf::from("build/fw.elf")));
        assert!(!parsed.list);
    }

    #[test]
    fn rejects_unknown_and_extra_arguments() {
        assert!(args(&["--frobnicate"]).is_err());
        assert!(args(&["a.out", "b.out"]).is_err());
        assert!(args(&["--template"]).is_err());
    }

    #[test]
    fn template_replaces_empty_init_script() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = DefaultPaths::with_home(tmp.path());
        let dir = paths.config_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("gdbinit-board.json"),
            r#"{"name":"board","default":true,"commands":["set confirm off","monitor reset"]}"#,
        )
        .unwrap();

        let mut config = Config::default();
        apply_template(&mut config, &paths, None).unwrap();
        assert_eq!(config.launch.init_script, "set confirm off\nmonitor reset");
        assert_eq!(config.debugger.command, "gdb");

        let mut config = Config::default();
        config.launch.init_script = "set pagination off".into();
        apply_template(&mut config, &paths, None).unwrap();
        assert_eq!(config.launch.init_script, "set pagination off");

        assert!(apply_template(&mut config, &paths, Some("missing")).is_err());
    }
}

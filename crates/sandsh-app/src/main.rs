//! sandsh interactive entry point.
//!
//! Wires together the pieces at startup (config, file log, interrupt flag,
//! host-rooted VFS, command registry) and then drives the read-eval loop:
//! print `{cwd}$ `, read a line, hand it to the shell, print the result.
//! Only `exit`, end-of-input, or a fatal startup error leave the loop.

mod config;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::Local;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use config::Config;
use sandsh_shell::{CommandOutput, CommandRegistry, Shell, register_builtins};
use sandsh_vfs::HostVfs;

fn main() -> Result<()> {
    let config = Config::load(Path::new("sandsh.toml"))?;
    init_logging(&config.log_file)?;
    log::info!("sandsh starting");

    let root = match &config.root {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("determining the launch directory")?,
    };
    let vfs =
        HostVfs::new(&root).with_context(|| format!("opening root {}", root.display()))?;
    log::info!("sandbox root: {}", vfs.root().display());

    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry);

    let mut shell = Shell::new(registry, Box::new(vfs));
    shell.set_history_limit(config.history_limit);
    for (name, expansion) in &config.aliases {
        shell.define_alias(name, expansion);
    }

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupt);
        ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
            .context("installing the interrupt handler")?;
    }
    shell.set_interrupt_flag(Arc::clone(&interrupt));

    let mut editor = DefaultEditor::new().context("initializing line input")?;
    loop {
        // A Ctrl-C from the previous command must not cancel the next one.
        interrupt.store(false, Ordering::SeqCst);
        let prompt = format!("{}$ ", shell.cwd());
        match editor.readline(&prompt) {
            Ok(line) => {
                if line.trim().eq_ignore_ascii_case("exit") {
                    break;
                }
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                match shell.execute(&line) {
                    Ok(CommandOutput::Text(text)) => {
                        if !text.is_empty() {
                            println!("{text}");
                        }
                    },
                    Ok(CommandOutput::Clear) => {
                        print!("\x1b[2J\x1b[H");
                        std::io::stdout().flush().ok();
                    },
                    Ok(CommandOutput::None) => {},
                    // Already logged at the dispatch boundary; the user
                    // sees a one-line message, never a backtrace.
                    Err(e) => println!("{e}"),
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("interrupted");
            },
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                log::error!("line input failed: {e}");
                return Err(e.into());
            },
        }
    }

    println!("goodbye");
    log::info!("sandsh shutting down");
    Ok(())
}

/// Route the log facade to an append-only file, one line per event:
/// timestamp, level, source location, message.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}:{} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

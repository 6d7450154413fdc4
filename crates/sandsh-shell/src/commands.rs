//! Core navigation and file commands, plus registration of every builtin.

use sandsh_types::error::{Result, ShellError};
use sandsh_vfs::{EntryKind, resolve};

use crate::registry::{Command, CommandOutput, CommandRegistry, Environment};

/// Register all built-in commands into a registry.
///
/// Builtins that need session state (`alias`, `history`, `watch`, ...) are
/// intercepted by the shell and are not part of the registry.
pub fn register_builtins(reg: &mut CommandRegistry) {
    reg.register(Box::new(LsCmd));
    reg.register(Box::new(CdCmd));
    reg.register(Box::new(PwdCmd));
    reg.register(Box::new(MkdirCmd));
    reg.register(Box::new(RmdirCmd));
    reg.register(Box::new(RmCmd));
    reg.register(Box::new(TouchCmd));
    reg.register(Box::new(CatCmd));
    reg.register(Box::new(EchoCmd));
    reg.register(Box::new(CpCmd));
    reg.register(Box::new(MvCmd));
    reg.register(Box::new(ClearCmd));
    reg.register(Box::new(ChmodCmd));
    reg.register(Box::new(ChownCmd));
    crate::file_commands::register_file_commands(reg);
    crate::text_commands::register_text_commands(reg);
    crate::compare_commands::register_compare_commands(reg);
    crate::digest_commands::register_digest_commands(reg);
    crate::calc_commands::register_calc_commands(reg);
    crate::system_commands::register_system_commands(reg);
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Positional argument or a usage error.
pub(crate) fn arg<'a>(args: &[&'a str], index: usize, usage: &str) -> Result<&'a str> {
    args.get(index)
        .copied()
        .ok_or_else(|| ShellError::Usage(usage.to_string()))
}

/// Read a file (resolved against the cwd) as lossy UTF-8 text.
pub(crate) fn read_text(env: &mut Environment<'_>, path: &str) -> Result<String> {
    let full = resolve(&env.cwd, path);
    let data = env.vfs.read(&full)?;
    Ok(String::from_utf8_lossy(&data).into_owned())
}

/// Read a file (resolved against the cwd) as raw bytes.
pub(crate) fn read_bytes(env: &mut Environment<'_>, path: &str) -> Result<Vec<u8>> {
    let full = resolve(&env.cwd, path);
    env.vfs.read(&full)
}

// ---------------------------------------------------------------------------
// ls
// ---------------------------------------------------------------------------

struct LsCmd;
impl Command for LsCmd {
    fn name(&self) -> &str {
        "ls"
    }
    fn description(&self) -> &str {
        "List directory contents"
    }
    fn usage(&self) -> &str {
        "ls [path]"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let path = match args.first() {
            Some(p) => resolve(&env.cwd, p),
            None => env.cwd.clone(),
        };
        let entries = env.vfs.readdir(&path)?;
        let mut lines = Vec::new();
        for e in &entries {
            let suffix = if e.kind == EntryKind::Directory { "/" } else { "" };
            lines.push(format!("{}{suffix}", e.name));
        }
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// cd
// ---------------------------------------------------------------------------

struct CdCmd;
impl Command for CdCmd {
    fn name(&self) -> &str {
        "cd"
    }
    fn description(&self) -> &str {
        "Change the working directory"
    }
    fn usage(&self) -> &str {
        "cd <directory>"
    }
    fn man(&self) -> &str {
        "Changes the shell's virtual working directory. The target must be \
         an existing directory inside the sandbox; on failure the working \
         directory is unchanged. The host process directory is never touched."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let target = resolve(&env.cwd, arg(args, 0, self.usage())?);
        let meta = env
            .vfs
            .stat(&target)
            .map_err(|_| ShellError::NotFound(format!("directory '{target}'")))?;
        if meta.kind != EntryKind::Directory {
            return Err(ShellError::Vfs(format!("not a directory: {target}")));
        }
        env.cwd = target;
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// pwd
// ---------------------------------------------------------------------------

struct PwdCmd;
impl Command for PwdCmd {
    fn name(&self) -> &str {
        "pwd"
    }
    fn description(&self) -> &str {
        "Print the working directory"
    }
    fn usage(&self) -> &str {
        "pwd"
    }
    fn execute(&self, _args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(env.cwd.clone()))
    }
}

// ---------------------------------------------------------------------------
// mkdir
// ---------------------------------------------------------------------------

struct MkdirCmd;
impl Command for MkdirCmd {
    fn name(&self) -> &str {
        "mkdir"
    }
    fn description(&self) -> &str {
        "Create a directory"
    }
    fn usage(&self) -> &str {
        "mkdir <directory>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let path = resolve(&env.cwd, name);
        env.vfs.mkdir(&path)?;
        Ok(CommandOutput::Text(format!("directory '{name}' created")))
    }
}

// ---------------------------------------------------------------------------
// rmdir
// ---------------------------------------------------------------------------

struct RmdirCmd;
impl Command for RmdirCmd {
    fn name(&self) -> &str {
        "rmdir"
    }
    fn description(&self) -> &str {
        "Remove a directory tree"
    }
    fn usage(&self) -> &str {
        "rmdir <directory>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let path = resolve(&env.cwd, name);
        // The working directory must keep denoting an existing directory.
        if env.cwd == path || env.cwd.starts_with(&format!("{path}/")) {
            return Err(ShellError::Vfs(format!(
                "cannot remove the working directory: {path}"
            )));
        }
        env.vfs.remove_dir(&path)?;
        Ok(CommandOutput::Text(format!("directory '{name}' removed")))
    }
}

// ---------------------------------------------------------------------------
// rm
// ---------------------------------------------------------------------------

struct RmCmd;
impl Command for RmCmd {
    fn name(&self) -> &str {
        "rm"
    }
    fn description(&self) -> &str {
        "Remove a file"
    }
    fn usage(&self) -> &str {
        "rm <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let path = resolve(&env.cwd, name);
        env.vfs.remove_file(&path)?;
        Ok(CommandOutput::Text(format!("file '{name}' removed")))
    }
}

// ---------------------------------------------------------------------------
// touch
// ---------------------------------------------------------------------------

struct TouchCmd;
impl Command for TouchCmd {
    fn name(&self) -> &str {
        "touch"
    }
    fn description(&self) -> &str {
        "Create an empty file"
    }
    fn usage(&self) -> &str {
        "touch <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let path = resolve(&env.cwd, name);
        env.vfs.write(&path, b"")?;
        Ok(CommandOutput::Text(format!("file '{name}' created")))
    }
}

// ---------------------------------------------------------------------------
// cat
// ---------------------------------------------------------------------------

struct CatCmd;
impl Command for CatCmd {
    fn name(&self) -> &str {
        "cat"
    }
    fn description(&self) -> &str {
        "Display file contents"
    }
    fn usage(&self) -> &str {
        "cat <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let text = read_text(env, name)?;
        Ok(CommandOutput::Text(text.trim_end_matches('\n').to_string()))
    }
}

// ---------------------------------------------------------------------------
// echo
// ---------------------------------------------------------------------------

struct EchoCmd;
impl Command for EchoCmd {
    fn name(&self) -> &str {
        "echo"
    }
    fn description(&self) -> &str {
        "Write text to output.txt"
    }
    fn usage(&self) -> &str {
        "echo <text...>"
    }
    fn man(&self) -> &str {
        "Joins its arguments with spaces and writes them to 'output.txt' in \
         the current directory, overwriting any previous contents."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.is_empty() {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let content = args.join(" ");
        let path = resolve(&env.cwd, "output.txt");
        env.vfs.write(&path, content.as_bytes())?;
        Ok(CommandOutput::Text(
            "content written to 'output.txt'".to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// cp
// ---------------------------------------------------------------------------

struct CpCmd;
impl Command for CpCmd {
    fn name(&self) -> &str {
        "cp"
    }
    fn description(&self) -> &str {
        "Copy a file"
    }
    fn usage(&self) -> &str {
        "cp <source> <dest>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let src = resolve(&env.cwd, args[0]);
        let dst = resolve(&env.cwd, args[1]);
        env.vfs.copy(&src, &dst)?;
        Ok(CommandOutput::Text(format!(
            "'{}' copied to '{}'",
            args[0], args[1]
        )))
    }
}

// ---------------------------------------------------------------------------
// mv
// ---------------------------------------------------------------------------

struct MvCmd;
impl Command for MvCmd {
    fn name(&self) -> &str {
        "mv"
    }
    fn description(&self) -> &str {
        "Move or rename a file"
    }
    fn usage(&self) -> &str {
        "mv <source> <dest>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let src = resolve(&env.cwd, args[0]);
        let dst = resolve(&env.cwd, args[1]);
        env.vfs.rename(&src, &dst)?;
        Ok(CommandOutput::Text(format!(
            "'{}' moved to '{}'",
            args[0], args[1]
        )))
    }
}

// ---------------------------------------------------------------------------
// clear
// ---------------------------------------------------------------------------

struct ClearCmd;
impl Command for ClearCmd {
    fn name(&self) -> &str {
        "clear"
    }
    fn description(&self) -> &str {
        "Clear the screen"
    }
    fn usage(&self) -> &str {
        "clear"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Clear)
    }
}

// ---------------------------------------------------------------------------
// chmod
// ---------------------------------------------------------------------------

struct ChmodCmd;
impl Command for ChmodCmd {
    fn name(&self) -> &str {
        "chmod"
    }
    fn description(&self) -> &str {
        "Change file mode bits"
    }
    fn usage(&self) -> &str {
        "chmod <octal-mode> <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 2 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let mode = u32::from_str_radix(args[0], 8).map_err(|_| {
            ShellError::Expression(format!("invalid octal mode '{}'", args[0]))
        })?;
        let path = resolve(&env.cwd, args[1]);
        env.vfs.set_mode(&path, mode)?;
        Ok(CommandOutput::Text(format!(
            "mode of '{}' changed to {:o}",
            args[1], mode
        )))
    }
}

// ---------------------------------------------------------------------------
// chown
// ---------------------------------------------------------------------------

struct ChownCmd;
impl Command for ChownCmd {
    fn name(&self) -> &str {
        "chown"
    }
    fn description(&self) -> &str {
        "Change file owner (simulated)"
    }
    fn usage(&self) -> &str {
        "chown <uid> <gid> <file>"
    }
    fn man(&self) -> &str {
        "Ownership is outside the sandbox model; the command validates its \
         arguments and the target file, then reports the change without \
         altering host ownership."
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        if args.len() != 3 {
            return Err(ShellError::Usage(self.usage().to_string()));
        }
        let uid: u32 = args[0]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid uid '{}'", args[0])))?;
        let gid: u32 = args[1]
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid gid '{}'", args[1])))?;
        let path = resolve(&env.cwd, args[2]);
        if !env.vfs.exists(&path) {
            return Err(ShellError::NotFound(path));
        }
        Ok(CommandOutput::Text(format!(
            "owner of '{}' changed to uid {uid}, gid {gid}",
            args[2]
        )))
    }
}

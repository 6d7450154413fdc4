//! Checksum and dump commands: sum, cksum, md5sum, sha1sum, sha256sum, od,
//! hexdump.

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use sandsh_types::error::Result;

use crate::commands::{arg, read_bytes};
use crate::registry::{Command, CommandOutput, CommandRegistry, Environment};
use crate::textutil;

/// Register checksum and dump commands.
pub fn register_digest_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(SumCmd));
    reg.register(Box::new(CksumCmd));
    reg.register(Box::new(Md5sumCmd));
    reg.register(Box::new(Sha1sumCmd));
    reg.register(Box::new(Sha256sumCmd));
    reg.register(Box::new(OdCmd));
    reg.register(Box::new(HexdumpCmd));
}

// ---------------------------------------------------------------------------
// sum / cksum
// ---------------------------------------------------------------------------

struct SumCmd;
impl Command for SumCmd {
    fn name(&self) -> &str {
        "sum"
    }
    fn description(&self) -> &str {
        "Print a 16-bit additive checksum"
    }
    fn usage(&self) -> &str {
        "sum <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let data = read_bytes(env, name)?;
        Ok(CommandOutput::Text(format!(
            "{} {} {name}",
            textutil::sum16(&data),
            data.len()
        )))
    }
}

struct CksumCmd;
impl Command for CksumCmd {
    fn name(&self) -> &str {
        "cksum"
    }
    fn description(&self) -> &str {
        "Print a CRC-32 checksum and byte count"
    }
    fn usage(&self) -> &str {
        "cksum <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let data = read_bytes(env, name)?;
        Ok(CommandOutput::Text(format!(
            "{} {} {name}",
            textutil::cksum_crc32(&data),
            data.len()
        )))
    }
}

// ---------------------------------------------------------------------------
// md5sum / sha1sum / sha256sum
// ---------------------------------------------------------------------------

fn digest_line<D: Digest>(data: &[u8], name: &str) -> String {
    let mut hasher = D::new();
    hasher.update(data);
    format!("{}  {name}", hex::encode(hasher.finalize()))
}

struct Md5sumCmd;
impl Command for Md5sumCmd {
    fn name(&self) -> &str {
        "md5sum"
    }
    fn description(&self) -> &str {
        "Print the MD5 digest of a file"
    }
    fn usage(&self) -> &str {
        "md5sum <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let data = read_bytes(env, name)?;
        Ok(CommandOutput::Text(digest_line::<Md5>(&data, name)))
    }
}

struct Sha1sumCmd;
impl Command for Sha1sumCmd {
    fn name(&self) -> &str {
        "sha1sum"
    }
    fn description(&self) -> &str {
        "Print the SHA-1 digest of a file"
    }
    fn usage(&self) -> &str {
        "sha1sum <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let data = read_bytes(env, name)?;
        Ok(CommandOutput::Text(digest_line::<Sha1>(&data, name)))
    }
}

struct Sha256sumCmd;
impl Command for Sha256sumCmd {
    fn name(&self) -> &str {
        "sha256sum"
    }
    fn description(&self) -> &str {
        "Print the SHA-256 digest of a file"
    }
    fn usage(&self) -> &str {
        "sha256sum <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let name = arg(args, 0, self.usage())?;
        let data = read_bytes(env, name)?;
        Ok(CommandOutput::Text(digest_line::<Sha256>(&data, name)))
    }
}

// ---------------------------------------------------------------------------
// od / hexdump
// ---------------------------------------------------------------------------

struct OdCmd;
impl Command for OdCmd {
    fn name(&self) -> &str {
        "od"
    }
    fn description(&self) -> &str {
        "Dump a file with octal offsets"
    }
    fn usage(&self) -> &str {
        "od <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let data = read_bytes(env, arg(args, 0, self.usage())?)?;
        Ok(CommandOutput::Text(textutil::od_lines(&data).join("\n")))
    }
}

struct HexdumpCmd;
impl Command for HexdumpCmd {
    fn name(&self) -> &str {
        "hexdump"
    }
    fn description(&self) -> &str {
        "Dump a file with hex offsets"
    }
    fn usage(&self) -> &str {
        "hexdump <file>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let data = read_bytes(env, arg(args, 0, self.usage())?)?;
        Ok(CommandOutput::Text(
            textutil::hexdump_lines(&data).join("\n"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shell;
    use crate::commands::register_builtins;
    use sandsh_vfs::{MemoryVfs, Vfs};

    fn shell_with(files: &[(&str, &[u8])]) -> Shell {
        let mut reg = crate::CommandRegistry::new();
        register_builtins(&mut reg);
        let mut vfs = MemoryVfs::new();
        for (path, content) in files {
            vfs.write(path, content).unwrap();
        }
        Shell::new(reg, Box::new(vfs))
    }

    fn run(sh: &mut Shell, line: &str) -> String {
        match sh.execute(line).unwrap() {
            CommandOutput::Text(s) => s,
            _ => String::new(),
        }
    }

    #[test]
    fn md5_of_empty_file_is_the_known_digest() {
        let mut sh = shell_with(&[("/empty", b"")]);
        assert_eq!(
            run(&mut sh, "md5sum empty"),
            "d41d8cd98f00b204e9800998ecf8427e  empty"
        );
    }

    #[test]
    fn sha1_of_known_input() {
        let mut sh = shell_with(&[("/f", b"abc")]);
        assert_eq!(
            run(&mut sh, "sha1sum f"),
            "a9993e364706816aba3e25717850c26c9cd0d89d  f"
        );
    }

    #[test]
    fn sha256_of_known_input() {
        let mut sh = shell_with(&[("/f", b"abc")]);
        assert_eq!(
            run(&mut sh, "sha256sum f"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad  f"
        );
    }

    #[test]
    fn digests_are_deterministic() {
        let mut sh = shell_with(&[("/f", b"same bytes")]);
        let first = run(&mut sh, "sha256sum f");
        let second = run(&mut sh, "sha256sum f");
        assert_eq!(first, second);
    }

    #[test]
    fn sum_prints_checksum_and_size() {
        let mut sh = shell_with(&[("/f", b"abc")]);
        assert_eq!(run(&mut sh, "sum f"), "294 3 f");
    }

    #[test]
    fn cksum_matches_posix_check_value() {
        let mut sh = shell_with(&[("/f", b"123456789")]);
        assert_eq!(run(&mut sh, "cksum f"), "930766865 9 f");
    }

    #[test]
    fn hexdump_rows() {
        let mut sh = shell_with(&[("/f", b"hi\x00")]);
        let out = run(&mut sh, "hexdump f");
        assert_eq!(out, format!("00000000  {:<48}  |hi.|", "68 69 00"));
    }

    #[test]
    fn od_rows() {
        let mut sh = shell_with(&[("/f", b"hi")]);
        let out = run(&mut sh, "od f");
        assert!(out.starts_with("0000000: 68 69"));
        assert!(out.ends_with("hi"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut sh = shell_with(&[]);
        assert!(sh.execute("md5sum ghost").is_err());
        assert!(sh.execute("cksum ghost").is_err());
    }
}

//! System-flavored commands: about, uname, whoami, date, cal, ps, top,
//! uptime, kill, sleep, yes.
//!
//! There is no process table or kernel underneath; ps/top/uptime/kill print
//! synthetic data by design.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use chrono::{Datelike, Local};
use rand::Rng;
use sandsh_types::error::{Result, ShellError};

use crate::commands::arg;
use crate::registry::{Command, CommandOutput, CommandRegistry, Environment};

/// Register system commands.
pub fn register_system_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(AboutCmd));
    reg.register(Box::new(UnameCmd));
    reg.register(Box::new(WhoamiCmd));
    reg.register(Box::new(DateCmd));
    reg.register(Box::new(CalCmd));
    reg.register(Box::new(PsCmd));
    reg.register(Box::new(TopCmd));
    reg.register(Box::new(UptimeCmd));
    reg.register(Box::new(KillCmd));
    reg.register(Box::new(SleepCmd));
    reg.register(Box::new(YesCmd));
}

/// Poll cadence for blocking commands.
const POLL: Duration = Duration::from_millis(100);

fn interrupted(env: &Environment<'_>) -> bool {
    env.interrupt
        .is_some_and(|flag| flag.load(Ordering::SeqCst))
}

/// Sleep in short slices; true means the wait was interrupted.
fn pause(env: &Environment<'_>, total: Duration) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if interrupted(env) {
            return true;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return interrupted(env);
        }
        std::thread::sleep(POLL.min(left));
    }
}

// ---------------------------------------------------------------------------
// about / uname / whoami / date
// ---------------------------------------------------------------------------

struct AboutCmd;
impl Command for AboutCmd {
    fn name(&self) -> &str {
        "about"
    }
    fn description(&self) -> &str {
        "Show information about this shell"
    }
    fn usage(&self) -> &str {
        "about"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(format!(
            "sandsh {}\na sandboxed shell by G.E. Studios",
            env!("CARGO_PKG_VERSION")
        )))
    }
}

struct UnameCmd;
impl Command for UnameCmd {
    fn name(&self) -> &str {
        "uname"
    }
    fn description(&self) -> &str {
        "Print the system name"
    }
    fn usage(&self) -> &str {
        "uname"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(format!(
            "sandsh {}",
            env!("CARGO_PKG_VERSION")
        )))
    }
}

struct WhoamiCmd;
impl Command for WhoamiCmd {
    fn name(&self) -> &str {
        "whoami"
    }
    fn description(&self) -> &str {
        "Print the current user's login name"
    }
    fn usage(&self) -> &str {
        "whoami"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "user".to_string());
        Ok(CommandOutput::Text(user))
    }
}

struct DateCmd;
impl Command for DateCmd {
    fn name(&self) -> &str {
        "date"
    }
    fn description(&self) -> &str {
        "Print the current date and time"
    }
    fn usage(&self) -> &str {
        "date"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ))
    }
}

// ---------------------------------------------------------------------------
// cal
// ---------------------------------------------------------------------------

struct CalCmd;
impl Command for CalCmd {
    fn name(&self) -> &str {
        "cal"
    }
    fn description(&self) -> &str {
        "Display a calendar"
    }
    fn usage(&self) -> &str {
        "cal [year]"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        match args.first() {
            Some(raw) => {
                let year: i32 = raw.parse().map_err(|_| {
                    ShellError::Expression(format!("invalid year '{raw}'"))
                })?;
                let mut out = Vec::new();
                for month in 1..=12 {
                    out.extend(month_lines(year, month));
                    out.push(String::new());
                }
                Ok(CommandOutput::Text(out.join("\n").trim_end().to_string()))
            },
            None => {
                let now = Local::now();
                Ok(CommandOutput::Text(
                    month_lines(now.year(), now.month()).join("\n"),
                ))
            },
        }
    }
}

const MONTH_NAMES: [&str; 13] = [
    "",
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

fn is_leap(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if is_leap(year) {
                29
            } else {
                28
            }
        },
    }
}

/// Day of week with Sunday = 0, by Zeller's congruence.
fn day_of_week(year: i32, month: u32, day: u32) -> u32 {
    let (m, y) = if month < 3 {
        (month + 12, year - 1)
    } else {
        (month, year)
    };
    let k = y % 100;
    let j = y / 100;
    let h = (day as i32 + (13 * (m as i32 + 1)) / 5 + k + k / 4 + j / 4 + 5 * j) % 7;
    // Zeller counts from Saturday = 0.
    ((h + 6) % 7) as u32
}

fn month_lines(year: i32, month: u32) -> Vec<String> {
    let mut lines = vec![
        format!("   {} {year}", MONTH_NAMES[month as usize]),
        "Su Mo Tu We Th Fr Sa".to_string(),
    ];
    let mut week: Vec<String> = vec!["  ".to_string(); day_of_week(year, month, 1) as usize];
    for day in 1..=days_in_month(year, month) {
        week.push(format!("{day:>2}"));
        if week.len() == 7 {
            lines.push(week.join(" "));
            week.clear();
        }
    }
    if !week.is_empty() {
        lines.push(week.join(" ").trim_end().to_string());
    }
    lines
}

// ---------------------------------------------------------------------------
// ps / top / uptime / kill
// ---------------------------------------------------------------------------

struct PsCmd;
impl Command for PsCmd {
    fn name(&self) -> &str {
        "ps"
    }
    fn description(&self) -> &str {
        "Show the simulated process table"
    }
    fn usage(&self) -> &str {
        "ps"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let table = [
            (1, "init", "running"),
            (2, "kernel", "running"),
            (3, "sandsh", "running"),
        ];
        let out: Vec<String> = table
            .iter()
            .map(|(pid, name, status)| format!("PID: {pid}, Name: {name}, Status: {status}"))
            .collect();
        Ok(CommandOutput::Text(out.join("\n")))
    }
}

struct TopCmd;
impl Command for TopCmd {
    fn name(&self) -> &str {
        "top"
    }
    fn description(&self) -> &str {
        "Show simulated resource usage"
    }
    fn usage(&self) -> &str {
        "top"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let mut rng = rand::thread_rng();
        Ok(CommandOutput::Text(format!(
            "simulated resource usage:\nCPU: {}%\nMemory: {}%\nDisk: {}%",
            rng.gen_range(1..=100),
            rng.gen_range(1..=100),
            rng.gen_range(1..=100)
        )))
    }
}

struct UptimeCmd;
impl Command for UptimeCmd {
    fn name(&self) -> &str {
        "uptime"
    }
    fn description(&self) -> &str {
        "Show simulated uptime"
    }
    fn usage(&self) -> &str {
        "uptime"
    }
    fn execute(&self, _args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let seconds: u64 = rand::thread_rng().gen_range(1000..36000);
        Ok(CommandOutput::Text(format!(
            "up {} hours, {} minutes",
            seconds / 3600,
            seconds / 60 % 60
        )))
    }
}

struct KillCmd;
impl Command for KillCmd {
    fn name(&self) -> &str {
        "kill"
    }
    fn description(&self) -> &str {
        "Simulate terminating a process"
    }
    fn usage(&self) -> &str {
        "kill <pid>"
    }
    fn execute(&self, args: &[&str], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let raw = arg(args, 0, self.usage())?;
        let pid: u32 = raw
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid pid '{raw}'")))?;
        Ok(CommandOutput::Text(format!(
            "simulated termination of process {pid}"
        )))
    }
}

// ---------------------------------------------------------------------------
// sleep / yes
// ---------------------------------------------------------------------------

struct SleepCmd;
impl Command for SleepCmd {
    fn name(&self) -> &str {
        "sleep"
    }
    fn description(&self) -> &str {
        "Pause for a number of seconds"
    }
    fn usage(&self) -> &str {
        "sleep <seconds>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let raw = arg(args, 0, self.usage())?;
        let seconds: f64 = raw
            .parse()
            .map_err(|_| ShellError::Expression(format!("invalid duration '{raw}'")))?;
        if !(0.0..=86_400.0).contains(&seconds) {
            return Err(ShellError::Expression(format!(
                "duration '{raw}' out of range"
            )));
        }
        if pause(env, Duration::from_secs_f64(seconds)) {
            return Err(ShellError::Interrupted);
        }
        Ok(CommandOutput::None)
    }
}

struct YesCmd;
impl Command for YesCmd {
    fn name(&self) -> &str {
        "yes"
    }
    fn description(&self) -> &str {
        "Repeat a string until interrupted"
    }
    fn usage(&self) -> &str {
        "yes <text>"
    }
    fn execute(&self, args: &[&str], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let text = arg(args, 0, self.usage())?;
        loop {
            if interrupted(env) {
                println!("yes: interrupted");
                return Ok(CommandOutput::None);
            }
            println!("{text}");
            if pause(env, POLL) {
                println!("yes: interrupted");
                return Ok(CommandOutput::None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Shell;
    use crate::commands::register_builtins;
    use sandsh_vfs::MemoryVfs;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn shell() -> Shell {
        let mut reg = crate::CommandRegistry::new();
        register_builtins(&mut reg);
        Shell::new(reg, Box::new(MemoryVfs::new()))
    }

    fn run(sh: &mut Shell, line: &str) -> String {
        match sh.execute(line).unwrap() {
            CommandOutput::Text(s) => s,
            _ => String::new(),
        }
    }

    #[test]
    fn zeller_known_dates() {
        // 2025-01-01 was a Wednesday, 2000-01-01 a Saturday.
        assert_eq!(day_of_week(2025, 1, 1), 3);
        assert_eq!(day_of_week(2000, 1, 1), 6);
        assert_eq!(day_of_week(2024, 2, 29), 4); // leap-day Thursday
    }

    #[test]
    fn leap_year_rules() {
        assert!(is_leap(2024));
        assert!(!is_leap(2025));
        assert!(!is_leap(1900));
        assert!(is_leap(2000));
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
    }

    #[test]
    fn month_grid_shape() {
        let lines = month_lines(2025, 1);
        assert_eq!(lines[0], "   January 2025");
        assert_eq!(lines[1], "Su Mo Tu We Th Fr Sa");
        // January 2025 starts on Wednesday: three leading blanks.
        assert!(lines[2].starts_with("          1"));
        let total: usize = lines[2..]
            .iter()
            .map(|l| l.split_whitespace().count())
            .sum();
        assert_eq!(total, 31);
    }

    #[test]
    fn cal_year_covers_all_months() {
        let mut sh = shell();
        let out = run(&mut sh, "cal 2025");
        assert!(out.contains("January 2025"));
        assert!(out.contains("December 2025"));
    }

    #[test]
    fn date_has_expected_shape() {
        let mut sh = shell();
        let out = run(&mut sh, "date");
        assert_eq!(out.len(), 19);
        assert_eq!(&out[4..5], "-");
    }

    #[test]
    fn ps_and_kill_are_simulated() {
        let mut sh = shell();
        assert!(run(&mut sh, "ps").contains("sandsh"));
        assert!(run(&mut sh, "kill 42").contains("42"));
        assert!(sh.execute("kill pid").is_err());
    }

    #[test]
    fn top_percentages_in_range() {
        let mut sh = shell();
        let out = run(&mut sh, "top");
        for line in out.lines().skip(1) {
            let pct: u32 = line
                .rsplit_once(' ')
                .and_then(|(_, v)| v.trim_end_matches('%').parse().ok())
                .unwrap();
            assert!((1..=100).contains(&pct));
        }
    }

    #[test]
    fn sleep_rejects_bad_durations() {
        let mut sh = shell();
        assert!(sh.execute("sleep soon").is_err());
        assert!(sh.execute("sleep -1").is_err());
    }

    #[test]
    fn sleep_zero_returns_immediately() {
        let mut sh = shell();
        assert_eq!(sh.execute("sleep 0").unwrap(), CommandOutput::None);
    }

    #[test]
    fn yes_stops_when_interrupted() {
        let mut sh = shell();
        let flag = Arc::new(AtomicBool::new(true));
        sh.set_interrupt_flag(Arc::clone(&flag));
        assert_eq!(sh.execute("yes hello").unwrap(), CommandOutput::None);
    }
}

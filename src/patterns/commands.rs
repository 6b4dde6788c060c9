//! Command classification tables for the exec detector.
//!
//! Matching is against the full lowercased command line (command + args).
//! The safe-prefix allowlist only applies when the line carries no shell
//! metacharacter, so a safe prefix cannot smuggle a chained command.

use std::sync::LazyLock;

use regex::Regex;

/// Destructive or irreversible command fragments. Any hit is critical and
/// blocks regardless of capabilities or trust.
const DANGEROUS_SUBSTRINGS: &[&str] = &[
    "rm -rf",
    "rm -fr",
    "mkfs",
    "dd if=",
    "chmod 777",
    "chmod -r 777",
    "> /dev/sda",
    "mv /* ",
];

/// `curl ... | sh` and `wget ... | bash` style download-and-execute. The
/// source is shared with the static scan rule table (same definition,
/// separate compilation).
pub(super) const PIPE_TO_SHELL_SRC: &str = r"(curl|wget)[^|\n]*\|\s*(sh|bash|zsh|dash)\b";

static PIPE_TO_SHELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PIPE_TO_SHELL_SRC).expect("static command pattern must compile"));

/// The classic `:(){ :|:& };:` with arbitrary interior whitespace.
static FORK_BOMB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r":\s*\(\s*\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:")
        .expect("static command pattern must compile")
});

/// Read-only utilities, git read + common write, package installs, version
/// probes, and build commands. Only consulted when the command line has no
/// shell metacharacter and no sensitive-command hit.
const SAFE_PREFIXES: &[&str] = &[
    "ls",
    "cat",
    "head",
    "tail",
    "grep",
    "rg",
    "find",
    "pwd",
    "echo",
    "wc",
    "which",
    "file",
    "stat",
    "du",
    "df",
    "date",
    "whoami",
    "uname",
    "git status",
    "git log",
    "git diff",
    "git branch",
    "git show",
    "git blame",
    "git add",
    "git commit",
    "git checkout",
    "git switch",
    "git pull",
    "git fetch",
    "git stash",
    "npm install",
    "npm ci",
    "npm run",
    "npm test",
    "yarn",
    "pnpm install",
    "pip install",
    "cargo build",
    "cargo check",
    "cargo test",
    "cargo run",
    "cargo fmt",
    "cargo clippy",
    "go build",
    "go test",
    "make",
    "node --version",
    "npm --version",
    "python --version",
    "python3 --version",
    "rustc --version",
    "tsc",
];

/// Commands that read credential or environment material. Entries with a
/// space or path match anywhere in the line; bare words must be the leading
/// token (so `env` does not hit `environment.ts`).
const SENSITIVE_COMMANDS: &[&str] = &[
    "cat /etc/passwd",
    "cat /etc/shadow",
    "cat ~/.ssh",
    "cat ~/.aws",
    "cat ~/.kube",
    "cat ~/.npmrc",
    "cat ~/.netrc",
    "printenv",
    "env",
    "set",
];

/// System administration commands: medium risk, audited.
const SYSTEM_COMMANDS: &[&str] = &[
    "sudo", "su", "systemctl", "service", "kill", "killall", "reboot", "shutdown", "mount",
    "umount", "crontab", "chown", "useradd", "usermod", "passwd",
];

/// Network-capable commands: medium risk, audited.
const NETWORK_COMMANDS: &[&str] = &[
    "curl", "wget", "nc", "ncat", "netcat", "ssh", "scp", "rsync", "ftp", "telnet", "dig",
    "nslookup",
];

/// Shell operators that can hide additional commands inside an otherwise
/// allowed line.
const SHELL_METACHARACTERS: &[char] = &[';', '|', '&', '`', '$', '(', ')', '{', '}'];

/// Env var name fragments that suggest credential material.
pub const SENSITIVE_ENV_KEYS: &[&str] =
    &["API_KEY", "SECRET", "PASSWORD", "TOKEN", "PRIVATE", "CREDENTIAL"];

/// Check the lowercased command line against the dangerous tables. Returns
/// the matched fragment for evidence.
pub fn dangerous_substring(lower: &str) -> Option<&'static str> {
    if let Some(hit) = DANGEROUS_SUBSTRINGS.iter().copied().find(|s| lower.contains(s)) {
        return Some(hit);
    }
    if PIPE_TO_SHELL.is_match(lower) {
        return Some("pipe to shell");
    }
    None
}

pub fn is_fork_bomb(command: &str) -> bool {
    FORK_BOMB.is_match(command)
}

pub fn has_shell_metacharacters(command: &str) -> bool {
    command.chars().any(|c| SHELL_METACHARACTERS.contains(&c))
}

/// True when the command is exactly a safe prefix or starts with one
/// followed by a space.
pub fn matches_safe_prefix(command: &str) -> bool {
    let trimmed = command.trim();
    SAFE_PREFIXES
        .iter()
        .any(|p| trimmed == *p || trimmed.starts_with(&format!("{p} ")))
}

/// Sensitive-command hit anywhere in the line (bare words only as the
/// leading token).
pub fn sensitive_command_hit(command: &str) -> Option<&'static str> {
    let trimmed = command.trim();
    let first = trimmed.split_whitespace().next().unwrap_or("");
    SENSITIVE_COMMANDS.iter().copied().find(|entry| {
        if entry.contains(' ') || entry.contains('/') {
            trimmed.contains(entry)
        } else {
            first == *entry
        }
    })
}

fn word_prefix_hit(command: &str, table: &'static [&'static str]) -> Option<&'static str> {
    let trimmed = command.trim();
    table.iter().copied().find(|word| {
        let starts = trimmed == *word || trimmed.starts_with(&format!("{word} "));
        let embedded = trimmed.contains(&format!(" {word} "))
            || trimmed.ends_with(&format!(" {word}"));
        starts || embedded
    })
}

/// System-command word at the start of the line or preceded by a space.
pub fn matches_system_prefix(command: &str) -> Option<&'static str> {
    word_prefix_hit(command, SYSTEM_COMMANDS)
}

/// Network-command word at the start of the line or preceded by a space.
pub fn matches_network_prefix(command: &str) -> Option<&'static str> {
    word_prefix_hit(command, NETWORK_COMMANDS)
}

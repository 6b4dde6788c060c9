//! The static scan rule table, plus the file discovery sets shared with
//! artifact hashing.
//!
//! Secret rules are derived from [`SECRET_PATTERNS`] rather than redefined,
//! so the network detector and the static scanner can never drift apart.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::secrets::{SecretPattern, SECRET_PATTERNS};
use super::RiskLevel;

/// File extensions the scanner discovers.
pub const SCAN_EXTENSIONS: &[&str] = &[
    "js", "ts", "jsx", "tsx", "mjs", "cjs", "py", "json", "yaml", "yml", "toml", "sol", "sh",
    "bash", "md",
];

/// Directories excluded from both scanning and artifact hashing.
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    ".git",
    "coverage",
    "__pycache__",
    ".venv",
    "venv",
];

/// Generated/minified files excluded from scanning.
pub const EXCLUDED_FILES: &[&str] = &["package-lock.json", "yarn.lock", "pnpm-lock.yaml"];

/// Finding category, used for the scan summary roll-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    Execution,
    Secrets,
    Exfiltration,
    Obfuscation,
    PromptInjection,
    Web3,
    SocialEngineering,
}

impl RuleCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Execution => "execution",
            Self::Secrets => "secrets",
            Self::Exfiltration => "exfiltration",
            Self::Obfuscation => "obfuscation",
            Self::PromptInjection => "prompt_injection",
            Self::Web3 => "web3",
            Self::SocialEngineering => "social_engineering",
        }
    }
}

impl std::fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

enum Matcher {
    Pattern(Regex),
    Secret(&'static SecretPattern),
}

/// One entry of the rule table: id, severity, extension filter (empty =
/// every scanned extension), category, and the matcher.
pub struct ScanRule {
    pub id: &'static str,
    pub severity: RiskLevel,
    pub extensions: &'static [&'static str],
    pub category: RuleCategory,
    matcher: Matcher,
}

impl ScanRule {
    pub fn applies_to(&self, extension: &str) -> bool {
        self.extensions.is_empty() || self.extensions.contains(&extension)
    }

    /// First match of this rule in `line`, if any.
    pub fn find<'t>(&self, line: &'t str) -> Option<&'t str> {
        match &self.matcher {
            Matcher::Pattern(re) => re.find(line).map(|m| m.as_str()),
            Matcher::Secret(secret) => secret.find(line),
        }
    }
}

const CODE: &[&str] = &["js", "ts", "jsx", "tsx", "mjs", "cjs", "py"];
const SHELL: &[&str] = &["sh", "bash"];
const SHELL_OR_DOCS: &[&str] = &["sh", "bash", "md"];
const SOLIDITY: &[&str] = &["sol"];
const MARKDOWN: &[&str] = &["md"];
const ALL: &[&str] = &[];

fn rule(
    id: &'static str,
    severity: RiskLevel,
    extensions: &'static [&'static str],
    category: RuleCategory,
    re: &str,
) -> ScanRule {
    ScanRule {
        id,
        severity,
        extensions,
        category,
        matcher: Matcher::Pattern(Regex::new(re).expect("static scan rule must compile")),
    }
}

/// The frozen scan rule table.
pub static SCAN_RULES: LazyLock<Vec<ScanRule>> = LazyLock::new(|| {
    let mut rules = vec![
        // Execution risks
        rule(
            "SHELL_EXEC",
            RiskLevel::High,
            CODE,
            RuleCategory::Execution,
            r"child_process|\bexecSync\s*\(|\bspawn(Sync)?\s*\(|\bos\.system\s*\(|subprocess\.(run|call|Popen)",
        ),
        rule(
            "EVAL_USAGE",
            RiskLevel::High,
            CODE,
            RuleCategory::Execution,
            r"\beval\s*\(|new\s+Function\s*\(",
        ),
        rule(
            "DYNAMIC_IMPORT",
            RiskLevel::Medium,
            CODE,
            RuleCategory::Execution,
            r"__import__\s*\(|importlib\.import_module",
        ),
        rule(
            "CURL_PIPE_SH",
            RiskLevel::Critical,
            SHELL_OR_DOCS,
            RuleCategory::Execution,
            super::commands::PIPE_TO_SHELL_SRC,
        ),
        rule(
            "DESTRUCTIVE_DELETE",
            RiskLevel::Critical,
            SHELL_OR_DOCS,
            RuleCategory::Execution,
            r"rm\s+-[a-zA-Z]*r[a-zA-Z]*f\s|rm\s+-[a-zA-Z]*f[a-zA-Z]*r\s",
        ),
        rule(
            "CHMOD_WORLD_WRITABLE",
            RiskLevel::Medium,
            SHELL,
            RuleCategory::Execution,
            r"(?i)chmod\s+(-r\s+)?777",
        ),
        // Secret reads
        rule(
            "ENV_FILE_READ",
            RiskLevel::Medium,
            CODE,
            RuleCategory::Secrets,
            r"readFileSync\s*\([^)]*\.env|open\s*\([^)]*\.env|\bdotenv\b|load_dotenv",
        ),
        rule(
            "SSH_KEY_READ",
            RiskLevel::High,
            ALL,
            RuleCategory::Secrets,
            r"\.ssh/id_(rsa|ed25519)",
        ),
        // Exfiltration
        rule(
            "WEBHOOK_EXFIL",
            RiskLevel::High,
            ALL,
            RuleCategory::Exfiltration,
            r"https?://(discord(app)?\.com|api\.telegram\.org|hooks\.slack\.com|webhook\.site|requestbin\.com|pipedream\.com|[a-z0-9.-]*ngrok(-free)?\.(io|app)|beeceptor\.com|mockbin\.org)",
        ),
        rule(
            "RAW_IP_URL",
            RiskLevel::Medium,
            ALL,
            RuleCategory::Exfiltration,
            r"https?://\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}",
        ),
        // Obfuscation
        rule(
            "EVAL_DECODE_CHAIN",
            RiskLevel::High,
            CODE,
            RuleCategory::Obfuscation,
            r"eval\s*\(\s*atob\s*\(|exec\s*\(\s*base64|Function\s*\(\s*atob",
        ),
        rule(
            "LONG_HEX_STRING",
            RiskLevel::Medium,
            ALL,
            RuleCategory::Obfuscation,
            r"[0-9a-fA-F]{200,}",
        ),
        rule(
            "BASE64_BLOB",
            RiskLevel::Medium,
            ALL,
            RuleCategory::Obfuscation,
            r"[A-Za-z0-9+/]{120,}={0,2}",
        ),
        // Prompt injection
        rule(
            "PROMPT_INJECTION",
            RiskLevel::High,
            ALL,
            RuleCategory::PromptInjection,
            r"(?i)ignore\s+(all|previous|prior)\s+instructions",
        ),
        rule(
            "SYSTEM_TAG_SPOOF",
            RiskLevel::High,
            ALL,
            RuleCategory::PromptInjection,
            r"(?i)</?\s*system\s*>|\[\s*system\s*\]",
        ),
        // Web3 / Solidity
        rule(
            "DANGEROUS_SELFDESTRUCT",
            RiskLevel::Critical,
            SOLIDITY,
            RuleCategory::Web3,
            r"selfdestruct\s*\(",
        ),
        rule(
            "UNLIMITED_APPROVAL",
            RiskLevel::High,
            SOLIDITY,
            RuleCategory::Web3,
            r"type\s*\(\s*uint256\s*\)\s*\.\s*max|uint256\s*\(\s*-1\s*\)|0x[fF]{64}",
        ),
        rule(
            "REENTRANCY_RISK",
            RiskLevel::High,
            SOLIDITY,
            RuleCategory::Web3,
            r"\.call\s*\{\s*value\s*:|\.call\.value\s*\(",
        ),
        rule(
            "ECRECOVER_NO_NONCE",
            RiskLevel::Medium,
            SOLIDITY,
            RuleCategory::Web3,
            r"ecrecover\s*\(",
        ),
        rule(
            "PROXY_UPGRADE",
            RiskLevel::High,
            SOLIDITY,
            RuleCategory::Web3,
            r"IMPLEMENTATION_SLOT",
        ),
        rule(
            "FLASH_LOAN_ENTRYPOINT",
            RiskLevel::Medium,
            SOLIDITY,
            RuleCategory::Web3,
            r"flashLoan\s*\(|executeOperation\s*\(|onFlashLoan\s*\(",
        ),
        // Social engineering in docs
        rule(
            "SOCIAL_ENGINEERING",
            RiskLevel::Medium,
            MARKDOWN,
            RuleCategory::SocialEngineering,
            r"(?i)urgent(ly)?\s+(verify|confirm)|do\s+not\s+tell|keep\s+this\s+(a\s+)?secret|verify\s+your\s+(seed|wallet|mnemonic)",
        ),
    ];

    // Secret rules come straight from the shared secret table.
    rules.extend(SECRET_PATTERNS.iter().map(|secret| ScanRule {
        id: secret.id,
        severity: secret.risk(),
        extensions: ALL,
        category: RuleCategory::Secrets,
        matcher: Matcher::Secret(secret),
    }));

    rules
});

/// Lockfiles and minified assets are skipped by name.
pub fn is_excluded_file(name: &str) -> bool {
    EXCLUDED_FILES.contains(&name) || name.ends_with(".min.js") || name.ends_with(".min.css")
}

//! Display tokens used to render the prompt.
//!
//! Tokens are layered: built-in defaults, then the optional JSON config file,
//! then `name value` pairs from the command line.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PromptError;
use crate::version::{CONFIG_ENV, CONFIG_FILE_NAME};

/// Symbolic role of a display token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Prefix,
    Suffix,
    Separator,
    Branch,
    NoHead,
    Staged,
    Conflicts,
    Changed,
    Clean,
    Untracked,
    Ahead,
    Behind,
}

impl Role {
    pub const ALL: [Role; 12] = [
        Role::Prefix,
        Role::Suffix,
        Role::Separator,
        Role::Branch,
        Role::NoHead,
        Role::Staged,
        Role::Conflicts,
        Role::Changed,
        Role::Clean,
        Role::Untracked,
        Role::Ahead,
        Role::Behind,
    ];

    /// Name used on the command line and in the config file.
    pub fn name(self) -> &'static str {
        match self {
            Role::Prefix => "prefix",
            Role::Suffix => "suffix",
            Role::Separator => "separator",
            Role::Branch => "branch",
            Role::NoHead => "nohead",
            Role::Staged => "staged",
            Role::Conflicts => "conflicts",
            Role::Changed => "changed",
            Role::Clean => "clean",
            Role::Untracked => "untracked",
            Role::Ahead => "ahead",
            Role::Behind => "behind",
        }
    }

    pub fn from_name(name: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.name() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tokens {
    pub prefix: String,
    pub suffix: String,
    pub separator: String,
    pub branch: String,
    pub no_head: String,
    pub staged: String,
    pub conflicts: String,
    pub changed: String,
    pub clean: String,
    pub untracked: String,
    pub ahead: String,
    pub behind: String,
}

impl Default for Tokens {
    fn default() -> Self {
        Tokens {
            prefix: "(".to_string(),
            suffix: ")".to_string(),
            separator: "|".to_string(),
            branch: String::new(),
            no_head: "(no branch)".to_string(),
            staged: "●".to_string(),
            conflicts: "✖".to_string(),
            changed: "✚".to_string(),
            clean: "✔".to_string(),
            untracked: "…".to_string(),
            ahead: "↑".to_string(),
            behind: "↓".to_string(),
        }
    }
}

impl Tokens {
    pub fn get(&self, role: Role) -> &str {
        match role {
            Role::Prefix => &self.prefix,
            Role::Suffix => &self.suffix,
            Role::Separator => &self.separator,
            Role::Branch => &self.branch,
            Role::NoHead => &self.no_head,
            Role::Staged => &self.staged,
            Role::Conflicts => &self.conflicts,
            Role::Changed => &self.changed,
            Role::Clean => &self.clean,
            Role::Untracked => &self.untracked,
            Role::Ahead => &self.ahead,
            Role::Behind => &self.behind,
        }
    }

    fn slot(&mut self, role: Role) -> &mut String {
        match role {
            Role::Prefix => &mut self.prefix,
            Role::Suffix => &mut self.suffix,
            Role::Separator => &mut self.separator,
            Role::Branch => &mut self.branch,
            Role::NoHead => &mut self.no_head,
            Role::Staged => &mut self.staged,
            Role::Conflicts => &mut self.conflicts,
            Role::Changed => &mut self.changed,
            Role::Clean => &mut self.clean,
            Role::Untracked => &mut self.untracked,
            Role::Ahead => &mut self.ahead,
            Role::Behind => &mut self.behind,
        }
    }

    /// Replace one token, consuming and returning the value.
    pub fn with(mut self, role: Role, value: impl Into<String>) -> Self {
        *self.slot(role) = value.into();
        self
    }

    /// Apply `name value` pairs taken from the command line.
    pub fn with_args(mut self, args: &[String]) -> Result<Self, PromptError> {
        let mut iter = args.iter();
        while let Some(name) = iter.next() {
            let role = Role::from_name(name)
                .ok_or_else(|| PromptError::InvalidArgument(format!("unknown token '{}'", name)))?;
            let value = iter
                .next()
                .ok_or_else(|| PromptError::InvalidArgument(format!("missing value for '{}'", name)))?;
            self = self.with(role, value.as_str());
        }
        Ok(self)
    }

    fn with_file(mut self, file: TokenFile) -> Self {
        let TokenFile {
            prefix,
            suffix,
            separator,
            branch,
            nohead,
            staged,
            conflicts,
            changed,
            clean,
            untracked,
            ahead,
            behind,
        } = file;
        let pairs = [
            (Role::Prefix, prefix),
            (Role::Suffix, suffix),
            (Role::Separator, separator),
            (Role::Branch, branch),
            (Role::NoHead, nohead),
            (Role::Staged, staged),
            (Role::Conflicts, conflicts),
            (Role::Changed, changed),
            (Role::Clean, clean),
            (Role::Untracked, untracked),
            (Role::Ahead, ahead),
            (Role::Behind, behind),
        ];
        for (role, value) in pairs {
            if let Some(value) = value {
                self = self.with(role, value);
            }
        }
        self
    }

    /// One `name: "value"` line per token, in role order.
    pub fn describe(&self) -> String {
        Role::ALL
            .iter()
            .map(|role| format!("{}: {:?}\n", role.name(), self.get(*role)))
            .collect()
    }
}

/// On-disk overrides. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TokenFile {
    prefix: Option<String>,
    suffix: Option<String>,
    separator: Option<String>,
    branch: Option<String>,
    nohead: Option<String>,
    staged: Option<String>,
    conflicts: Option<String>,
    changed: Option<String>,
    clean: Option<String>,
    untracked: Option<String>,
    ahead: Option<String>,
    behind: Option<String>,
}

/// Config file location: `$GIT_PROMPT_CONFIG`, else `~/.git-prompt.json`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(CONFIG_FILE_NAME))
}

/// Defaults overlaid with the file at `path`, if it exists.
pub fn load(path: Option<&Path>) -> Result<Tokens> {
    let tokens = Tokens::default();
    let Some(path) = path else {
        return Ok(tokens);
    };
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No config file at {}", path.display());
            return Ok(tokens);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("Failed to read {}", path.display()));
        }
    };
    let file: TokenFile = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    log::debug!("Loaded tokens from {}", path.display());
    Ok(tokens.with_file(file))
}

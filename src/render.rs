use crate::status::Counters;
use crate::tokens::Tokens;

/// What HEAD points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchState {
    Named(String),
    /// A branch with no commits yet.
    Unborn,
    /// HEAD points straight at a commit; holds the abbreviated id.
    Detached(String),
}

impl BranchState {
    pub fn label<'a>(&'a self, tokens: &'a Tokens) -> &'a str {
        match self {
            BranchState::Named(name) => name,
            BranchState::Unborn => &tokens.no_head,
            BranchState::Detached(short_id) => short_id,
        }
    }
}

/// Render the prompt string. Pure: same inputs, same output.
///
/// Only one divergence segment is shown. When the branch is both ahead and
/// behind, behind wins and the ahead count is dropped.
pub fn render(counters: &Counters, branch: &BranchState, tokens: &Tokens) -> String {
    let mut out = String::new();
    out.push_str(&tokens.prefix);
    out.push_str(&tokens.branch);
    out.push_str(branch.label(tokens));

    if counters.is_clean() {
        out.push_str(&tokens.separator);
        out.push_str(&tokens.clean);
        out.push_str(&tokens.suffix);
        return out;
    }

    if counters.behind > 0 {
        push_count(&mut out, &tokens.behind, counters.behind);
    } else if counters.ahead > 0 {
        push_count(&mut out, &tokens.ahead, counters.ahead);
    }

    if counters.total_changes() > 0 {
        out.push_str(&tokens.separator);
    }
    if counters.staged > 0 {
        push_count(&mut out, &tokens.staged, counters.staged);
    }
    if counters.changed > 0 {
        push_count(&mut out, &tokens.changed, counters.changed);
    }
    // presence only, no count
    if counters.untracked > 0 {
        out.push_str(&tokens.untracked);
    }
    if counters.conflicts > 0 {
        push_count(&mut out, &tokens.conflicts, counters.conflicts);
    }

    out.push_str(&tokens.suffix);
    out
}

fn push_count(out: &mut String, token: &str, count: usize) {
    out.push_str(token);
    out.push_str(&count.to_string());
}

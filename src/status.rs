//! Reduction of per-path change records into prompt counters.

use std::fmt;

/// A single kind of change reported for one side (index or worktree) of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    New,
    Modified,
    Deleted,
    Renamed,
    Typechange,
    /// Worktree only: the file exists but could not be read. git2 does not
    /// surface this state, so only other backends produce it.
    #[allow(dead_code)]
    Unreadable,
}

impl Change {
    fn bit(self) -> u8 {
        match self {
            Change::New => 1 << 0,
            Change::Modified => 1 << 1,
            Change::Deleted => 1 << 2,
            Change::Renamed => 1 << 3,
            Change::Typechange => 1 << 4,
            Change::Unreadable => 1 << 5,
        }
    }
}

/// Set of [`Change`] kinds for one side of a path.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet(u8);

impl ChangeSet {
    pub fn empty() -> Self {
        ChangeSet(0)
    }

    pub fn insert(&mut self, change: Change) {
        self.0 |= change.bit();
    }

    pub fn contains(&self, change: Change) -> bool {
        self.0 & change.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// True when `change` is the only member of the set.
    pub fn is_only(&self, change: Change) -> bool {
        self.0 == change.bit()
    }
}

impl fmt::Debug for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let all = [
            Change::New,
            Change::Modified,
            Change::Deleted,
            Change::Renamed,
            Change::Typechange,
            Change::Unreadable,
        ];
        f.debug_set()
            .entries(all.iter().filter(|c| self.contains(**c)))
            .finish()
    }
}

impl FromIterator<Change> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = Change>>(iter: I) -> Self {
        let mut set = ChangeSet::empty();
        for change in iter {
            set.insert(change);
        }
        set
    }
}

/// Status of one path as delivered by the VCS layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub path: String,
    pub index: ChangeSet,
    pub worktree: ChangeSet,
    /// Set when the backend itself reports the path as conflicted.
    pub conflicted: bool,
}

impl ChangeRecord {
    pub fn new(path: impl Into<String>, index: ChangeSet, worktree: ChangeSet) -> Self {
        ChangeRecord {
            path: path.into(),
            index,
            worktree,
            conflicted: false,
        }
    }

    pub fn has_index_change(&self) -> bool {
        !self.index.is_empty()
    }

    pub fn has_worktree_change(&self) -> bool {
        !self.worktree.is_empty()
    }

    pub fn is_clean(&self) -> bool {
        !self.conflicted && !self.has_index_change() && !self.has_worktree_change()
    }
}

/// Which counter a change record lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Conflict,
    Staged,
    Changed,
    Untracked,
}

/// Classify a single record; `None` for clean records.
///
/// First match wins:
/// 1. clean on both sides: skipped
/// 2. backend conflict flag, or changes on both sides: conflict
/// 3. index changes only: staged
/// 4. worktree changes other than a lone "new": changed
/// 5. worktree "new" only: untracked
///
/// Rule 2's both-sides test is a heuristic. libgit2 does report conflicts
/// directly, but the heuristic is kept as a fallback so a path modified in
/// the index and again in the worktree also shows up as a conflict.
pub fn classify(record: &ChangeRecord) -> Option<Class> {
    if record.is_clean() {
        return None;
    }
    if record.conflicted || (record.has_index_change() && record.has_worktree_change()) {
        return Some(Class::Conflict);
    }
    if record.has_index_change() {
        return Some(Class::Staged);
    }
    if record.worktree.is_only(Change::New) {
        Some(Class::Untracked)
    } else {
        Some(Class::Changed)
    }
}

/// Index-side submodule state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmoduleIndex {
    pub added: bool,
    pub deleted: bool,
    pub modified: bool,
}

/// Worktree-side submodule state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmoduleWorktree {
    pub uninitialized: bool,
    pub added: bool,
    pub deleted: bool,
    pub modified: bool,
    pub index_modified: bool,
    pub worktree_modified: bool,
    pub untracked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmoduleRecord {
    pub name: String,
    pub index: SubmoduleIndex,
    pub worktree: SubmoduleWorktree,
}

impl SubmoduleRecord {
    pub fn is_staged(&self) -> bool {
        let i = &self.index;
        i.added || i.deleted || i.modified
    }

    pub fn is_changed(&self) -> bool {
        let w = &self.worktree;
        w.uninitialized
            || w.added
            || w.deleted
            || w.modified
            || w.index_modified
            || w.worktree_modified
    }

    pub fn has_untracked(&self) -> bool {
        self.worktree.untracked
    }
}

/// Aggregated prompt counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub staged: usize,
    pub changed: usize,
    pub untracked: usize,
    pub conflicts: usize,
    pub ahead: usize,
    pub behind: usize,
}

impl Counters {
    /// Sum of the four working-tree counters.
    pub fn total_changes(&self) -> usize {
        self.staged + self.changed + self.untracked + self.conflicts
    }

    pub fn is_clean(&self) -> bool {
        self.total_changes() == 0 && self.ahead == 0 && self.behind == 0
    }

    fn count(&mut self, class: Class) {
        match class {
            Class::Conflict => self.conflicts += 1,
            Class::Staged => self.staged += 1,
            Class::Changed => self.changed += 1,
            Class::Untracked => self.untracked += 1,
        }
    }

    /// A submodule may bump several counters at once.
    fn count_submodule(&mut self, record: &SubmoduleRecord) {
        if record.is_staged() {
            self.staged += 1;
        }
        if record.is_changed() {
            self.changed += 1;
        }
        if record.has_untracked() {
            self.untracked += 1;
        }
    }
}

/// Build counters from path records and submodule records.
///
/// `ahead`/`behind` are left at zero; they come from the upstream lookup.
pub fn aggregate<'a, R, S>(records: R, submodules: S) -> Counters
where
    R: IntoIterator<Item = &'a ChangeRecord>,
    S: IntoIterator<Item = &'a SubmoduleRecord>,
{
    let mut counters = Counters::default();
    for class in records.into_iter().filter_map(classify) {
        counters.count(class);
    }
    for submodule in submodules {
        counters.count_submodule(submodule);
    }
    counters
}

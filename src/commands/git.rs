use git2::{
    ErrorCode, ObjectType, Repository, RepositoryOpenFlags, Status, StatusOptions, StatusShow,
    SubmoduleIgnore, SubmoduleStatus,
};
use std::ffi::OsStr;
use std::path::Path;

use crate::error::{PromptError, Result};
use crate::render::BranchState;
use crate::status::{
    self, Change, ChangeRecord, ChangeSet, Counters, SubmoduleIndex, SubmoduleRecord,
    SubmoduleWorktree,
};

/// Everything the renderer needs from one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub branch: BranchState,
    pub counters: Counters,
}

/// Discovery walks up parent directories and across mount points.
fn discovery_flags() -> RepositoryOpenFlags {
    RepositoryOpenFlags::CROSS_FS
}

/// Find and open the repository containing `start`, walking up parents.
pub fn open_repository(start: &Path) -> Result<Repository> {
    Repository::open_ext(start, discovery_flags(), std::iter::empty::<&OsStr>())
        .map_err(|err| match err.code() {
            ErrorCode::NotFound => PromptError::RepositoryNotFound(err.message().to_string()),
            _ => PromptError::RepositoryOpenFailed(err.message().to_string()),
        })
}

/// Per-path status of index and worktree. Bare repositories have no
/// worktree and yield nothing.
pub fn change_records(repo: &Repository) -> Result<Vec<ChangeRecord>> {
    if repo.is_bare() {
        log::debug!("Bare repository, skipping status");
        return Ok(Vec::new());
    }

    // No submodule recursion, pathspec matching or index refresh.
    let mut opts = StatusOptions::new();
    opts.show(StatusShow::IndexAndWorkdir)
        .include_untracked(true)
        .exclude_submodules(true)
        .disable_pathspec_match(true)
        .no_refresh(true);
    let statuses = repo
        .statuses(Some(&mut opts))
        .map_err(|err| PromptError::StatusEnumerationFailed(err.message().to_string()))?;

    Ok(statuses
        .iter()
        .filter(|entry| !entry.status().contains(Status::IGNORED))
        .map(|entry| to_record(&String::from_utf8_lossy(entry.path_bytes()), entry.status()))
        .collect())
}

fn to_record(path: &str, status: Status) -> ChangeRecord {
    let index: ChangeSet = [
        (Status::INDEX_NEW, Change::New),
        (Status::INDEX_MODIFIED, Change::Modified),
        (Status::INDEX_DELETED, Change::Deleted),
        (Status::INDEX_RENAMED, Change::Renamed),
        (Status::INDEX_TYPECHANGE, Change::Typechange),
    ]
    .into_iter()
    .filter(|(flag, _)| status.contains(*flag))
    .map(|(_, change)| change)
    .collect();

    let worktree: ChangeSet = [
        (Status::WT_NEW, Change::New),
        (Status::WT_MODIFIED, Change::Modified),
        (Status::WT_DELETED, Change::Deleted),
        (Status::WT_RENAMED, Change::Renamed),
        (Status::WT_TYPECHANGE, Change::Typechange),
        // git2 has no WT_UNREADABLE bit, so Change::Unreadable never comes from here.
    ]
    .into_iter()
    .filter(|(flag, _)| status.contains(*flag))
    .map(|(_, change)| change)
    .collect();

    let mut record = ChangeRecord::new(path, index, worktree);
    record.conflicted = status.contains(Status::CONFLICTED);
    record
}

/// Status of every submodule. Slow on large checkouts, so opt-in.
pub fn submodule_records(repo: &Repository) -> Result<Vec<SubmoduleRecord>> {
    let submodules = repo
        .submodules()
        .map_err(|err| PromptError::SubmoduleEnumerationFailed(err.message().to_string()))?;

    let mut records = Vec::with_capacity(submodules.len());
    for submodule in &submodules {
        let name = String::from_utf8_lossy(submodule.name_bytes()).into_owned();
        let status = repo
            .submodule_status(&name, SubmoduleIgnore::Unspecified)
            .map_err(|err| {
                PromptError::SubmoduleEnumerationFailed(format!("{}: {}", name, err.message()))
            })?;
        records.push(to_submodule_record(name, status));
    }
    Ok(records)
}

fn to_submodule_record(name: String, status: SubmoduleStatus) -> SubmoduleRecord {
    SubmoduleRecord {
        name,
        index: SubmoduleIndex {
            added: status.contains(SubmoduleStatus::INDEX_ADDED),
            deleted: status.contains(SubmoduleStatus::INDEX_DELETED),
            modified: status.contains(SubmoduleStatus::INDEX_MODIFIED),
        },
        worktree: SubmoduleWorktree {
            uninitialized: status.contains(SubmoduleStatus::WD_UNINITIALIZED),
            added: status.contains(SubmoduleStatus::WD_ADDED),
            deleted: status.contains(SubmoduleStatus::WD_DELETED),
            modified: status.contains(SubmoduleStatus::WD_MODIFIED),
            index_modified: status.contains(SubmoduleStatus::WD_INDEX_MODIFIED),
            worktree_modified: status.contains(SubmoduleStatus::WD_WD_MODIFIED),
            untracked: status.contains(SubmoduleStatus::WD_UNTRACKED),
        },
    }
}

pub fn resolve_head(repo: &Repository) -> Result<BranchState> {
    let head = match repo.head() {
        Ok(head) => head,
        Err(err) if err.code() == ErrorCode::UnbornBranch => return Ok(BranchState::Unborn),
        Err(err) => return Err(head_error(err)),
    };

    if head.is_branch() {
        let name = String::from_utf8_lossy(head.shorthand_bytes()).into_owned();
        return Ok(BranchState::Named(name));
    }

    let commit = head.peel(ObjectType::Commit).map_err(head_error)?;
    let short_id = commit.short_id().map_err(head_error)?;
    Ok(BranchState::Detached(short_id.as_str().unwrap_or_default().to_string()))
}

fn head_error(err: git2::Error) -> PromptError {
    PromptError::HeadResolutionFailed(err.message().to_string())
}

/// Commits ahead of and behind `refs/remotes/<remote>/<branch>`.
///
/// The remote is the first one libgit2 lists, which is not necessarily the
/// branch's configured upstream. No remote, or no matching remote branch,
/// gives `(0, 0)`.
pub fn upstream_divergence(repo: &Repository, branch: &BranchState) -> Result<(usize, usize)> {
    let BranchState::Named(name) = branch else {
        return Ok((0, 0));
    };

    let remotes = repo
        .remotes()
        .map_err(|err| PromptError::RemoteListingFailed(err.message().to_string()))?;
    let Some(remote) = remotes.iter().flatten().next() else {
        log::debug!("No remotes configured");
        return Ok((0, 0));
    };

    let upstream_ref = format!("refs/remotes/{}/{}", remote, name);
    let upstream = match repo.refname_to_id(&upstream_ref) {
        Ok(oid) => oid,
        Err(err) => {
            log::debug!("No upstream {}: {}", upstream_ref, err.message());
            return Ok((0, 0));
        }
    };
    log::debug!("Comparing against {}", upstream_ref);

    let ahead_behind_error =
        |err: git2::Error| PromptError::AheadBehindComputationFailed(err.message().to_string());
    let local = repo.refname_to_id("HEAD").map_err(ahead_behind_error)?;
    repo.graph_ahead_behind(local, upstream).map_err(ahead_behind_error)
}

/// Collect branch and counters for the repository containing `start`.
pub fn snapshot(start: &Path, include_submodules: bool) -> Result<Snapshot> {
    let repo = open_repository(start)?;
    log::debug!("Opened repository at {}", repo.path().display());

    let records = change_records(&repo)?;
    let submodules = if include_submodules {
        submodule_records(&repo)?
    } else {
        Vec::new()
    };
    log::debug!("{} status entries, {} submodules", records.len(), submodules.len());
    for record in &records {
        log::trace!("{}: {:?}", record.path, status::classify(record));
    }
    for submodule in &submodules {
        log::trace!("submodule {}: {:?} {:?}", submodule.name, submodule.index, submodule.worktree);
    }

    let mut counters = status::aggregate(&records, &submodules);
    let branch = resolve_head(&repo)?;
    let (ahead, behind) = upstream_divergence(&repo, &branch)?;
    counters.ahead = ahead;
    counters.behind = behind;
    log::debug!("Branch {:?}, counters {:?}", branch, counters);

    Ok(Snapshot { branch, counters })
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Commit, Oid, RepositoryInitOptions, Signature};
    use std::fs;
    use tempfile::TempDir;

    fn init_repo() -> (TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();
        (dir, repo)
    }

    fn write(repo: &Repository, name: &str, contents: &str) {
        fs::write(repo.workdir().unwrap().join(name), contents).unwrap();
    }

    fn stage(repo: &Repository, name: &str) {
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
    }

    fn commit_file(repo: &Repository, name: &str, contents: &str) -> Oid {
        write(repo, name, contents);
        stage(repo, name);
        let mut index = repo.index().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Prompt Test", "prompt@example.com").unwrap();
        let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&Commit> = parent.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, "commit", &tree, &parents).unwrap()
    }

    #[test]
    fn test_outside_repository_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            open_repository(dir.path()),
            Err(PromptError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn test_discovery_crosses_filesystems() {
        assert!(discovery_flags().contains(RepositoryOpenFlags::CROSS_FS));
        assert!(!discovery_flags().contains(RepositoryOpenFlags::NO_SEARCH));
    }

    #[test]
    fn test_discovers_from_subdirectory() {
        let (dir, _repo) = init_repo();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        let repo = open_repository(&nested).unwrap();
        assert_eq!(
            repo.workdir().unwrap().canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_unborn_head() {
        let (_dir, repo) = init_repo();
        assert_eq!(resolve_head(&repo).unwrap(), BranchState::Unborn);
        assert_eq!(upstream_divergence(&repo, &BranchState::Unborn).unwrap(), (0, 0));
    }

    #[test]
    fn test_unborn_snapshot_with_untracked_file() {
        let (dir, repo) = init_repo();
        write(&repo, "new.txt", "hello");

        let snap = snapshot(dir.path(), false).unwrap();
        assert_eq!(snap.branch, BranchState::Unborn);
        assert_eq!(snap.counters, Counters { untracked: 1, ..Default::default() });
    }

    #[test]
    fn test_named_branch_and_counts() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "a");
        commit_file(&repo, "b.txt", "b");

        write(&repo, "a.txt", "a changed in the worktree");
        write(&repo, "c.txt", "c");
        stage(&repo, "c.txt");
        write(&repo, "d.txt", "d");

        let snap = snapshot(dir.path(), false).unwrap();
        assert_eq!(snap.branch, BranchState::Named("main".to_string()));
        assert_eq!(
            snap.counters,
            Counters { staged: 1, changed: 1, untracked: 1, ..Default::default() }
        );
    }

    #[test]
    fn test_staged_then_modified_counts_as_conflict() {
        let (dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "a");
        write(&repo, "a.txt", "staged edit");
        stage(&repo, "a.txt");
        write(&repo, "a.txt", "and another edit on top");

        let snap = snapshot(dir.path(), false).unwrap();
        assert_eq!(snap.counters, Counters { conflicts: 1, ..Default::default() });
    }

    #[test]
    fn test_detached_head_uses_short_id() {
        let (_dir, repo) = init_repo();
        let first = commit_file(&repo, "a.txt", "a");
        commit_file(&repo, "a.txt", "b");
        repo.set_head_detached(first).unwrap();

        let BranchState::Detached(short_id) = resolve_head(&repo).unwrap() else {
            panic!("expected detached HEAD");
        };
        assert!(short_id.len() >= 7);
        assert!(first.to_string().starts_with(&short_id));
    }

    #[test]
    fn test_no_remote_means_no_divergence() {
        let (_dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "a");
        let branch = resolve_head(&repo).unwrap();
        assert_eq!(upstream_divergence(&repo, &branch).unwrap(), (0, 0));
    }

    #[test]
    fn test_missing_remote_branch_means_no_divergence() {
        let (_dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "a");
        repo.remote("origin", "https://example.invalid/repo.git").unwrap();
        let branch = resolve_head(&repo).unwrap();
        assert_eq!(upstream_divergence(&repo, &branch).unwrap(), (0, 0));
    }

    #[test]
    fn test_ahead_and_behind_of_first_remote() {
        let (dir, repo) = init_repo();
        let first = commit_file(&repo, "a.txt", "a");
        commit_file(&repo, "a.txt", "b");
        repo.remote("origin", "https://example.invalid/repo.git").unwrap();
        repo.reference("refs/remotes/origin/main", first, true, "test").unwrap();

        let snap = snapshot(dir.path(), false).unwrap();
        assert_eq!(snap.counters, Counters { ahead: 1, ..Default::default() });

        // Move the remote past us on a side commit: one each way.
        let sig = Signature::now("Prompt Test", "prompt@example.com").unwrap();
        let base = repo.find_commit(first).unwrap();
        let tree = base.tree().unwrap();
        let side = repo.commit(None, &sig, &sig, "side", &tree, &[&base]).unwrap();
        repo.reference("refs/remotes/origin/main", side, true, "test").unwrap();

        let branch = BranchState::Named("main".to_string());
        assert_eq!(upstream_divergence(&repo, &branch).unwrap(), (1, 1));
    }

    #[test]
    fn test_no_submodules() {
        let (_dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "a");
        assert!(submodule_records(&repo).unwrap().is_empty());
    }

    #[test]
    fn test_submodule_status_is_read() {
        let (_lib_dir, lib) = init_repo();
        commit_file(&lib, "lib.txt", "lib");

        let (_dir, repo) = init_repo();
        commit_file(&repo, "a.txt", "a");
        let url = lib.workdir().unwrap().to_str().unwrap().to_string();
        let mut submodule = repo.submodule(&url, Path::new("lib"), true).unwrap();
        submodule.clone(None).unwrap();
        submodule.add_finalize().unwrap();

        let records = submodule_records(&repo).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "lib");
        assert!(records[0].is_staged());
        assert!(!records[0].has_untracked());

        write(&repo, "lib/scratch.txt", "untracked inside the submodule");
        let records = submodule_records(&repo).unwrap();
        assert!(records[0].has_untracked());
    }

    #[test]
    fn test_bare_repository_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init_bare(dir.path()).unwrap();
        assert!(change_records(&repo).unwrap().is_empty());
    }

    #[test]
    fn test_status_flags_map_to_change_sets() {
        let record = to_record("x", Status::INDEX_RENAMED | Status::WT_MODIFIED);
        assert!(record.index.is_only(Change::Renamed));
        assert!(record.worktree.is_only(Change::Modified));
        assert!(!record.conflicted);

        let untracked = to_record("y", Status::WT_NEW);
        assert!(untracked.index.is_empty());
        assert!(untracked.worktree.is_only(Change::New));

        assert!(to_record("z", Status::CONFLICTED).conflicted);
        assert!(to_record("w", Status::CURRENT).is_clean());
    }

    #[test]
    fn test_submodule_flags_map_to_record() {
        let record = to_submodule_record(
            "lib".to_string(),
            SubmoduleStatus::IN_HEAD
                | SubmoduleStatus::INDEX_ADDED
                | SubmoduleStatus::WD_UNTRACKED,
        );
        assert!(record.is_staged());
        assert!(!record.is_changed());
        assert!(record.has_untracked());
    }
}

use super::{core_err, json_pretty, EXIT_SUCCESS};
use wpstack_core::{ArtifactInfo, ArtifactOutcome, Engine, SideEffect, VcsState};
use wpstack_store::ArtifactKind;

pub fn create(engine: &Engine, kind: ArtifactKind, name: &str, json: bool) -> Result<u8, String> {
    let outcome = engine.create_artifact(kind, name).map_err(core_err)?;
    print_outcome(&outcome, "created", json)
}

pub fn clone(
    engine: &Engine,
    kind: ArtifactKind,
    url: &str,
    name: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let outcome = engine.clone_artifact(kind, url, name).map_err(core_err)?;
    print_outcome(&outcome, "cloned", json)
}

pub fn init_repo(engine: &Engine, kind: ArtifactKind, name: &str, json: bool) -> Result<u8, String> {
    let outcome = engine.init_artifact_repo(kind, name).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&outcome)?);
    } else if outcome.initialized {
        println!(
            "initialized repository for {kind} '{name}' at {}",
            outcome.path.display()
        );
        println!("add a remote with: git -C {} remote add origin <url>", outcome.path.display());
    } else {
        println!("{kind} '{name}' is already a repository; nothing to do");
    }
    Ok(EXIT_SUCCESS)
}

pub fn list(engine: &Engine, kind: ArtifactKind, fetch: bool, json: bool) -> Result<u8, String> {
    let items = engine.list_artifacts(kind, fetch).map_err(core_err)?;
    if json {
        println!("{}", json_pretty(&items)?);
    } else if items.is_empty() {
        println!("no {kind}s in {}", kind.root(engine.layout()).display());
    } else {
        println!("{:<28} {:<8} {:<8} REPOSITORY", "NAME", "ACTIVE", "COMMITS");
        for item in &items {
            println!(
                "{:<28} {:<8} {:<8} {}",
                item.name,
                active_label(item),
                item.commits,
                vcs_label(&item.vcs)
            );
        }
    }
    Ok(EXIT_SUCCESS)
}

fn print_outcome(outcome: &ArtifactOutcome, verb: &str, json: bool) -> Result<u8, String> {
    if json {
        println!("{}", json_pretty(outcome)?);
        return Ok(EXIT_SUCCESS);
    }
    println!(
        "{verb} {} '{}' at {}",
        outcome.kind,
        outcome.name,
        outcome.path.display()
    );
    match &outcome.activation {
        SideEffect::Ok => println!("activated"),
        other => println!("activation {other}"),
    }
    Ok(EXIT_SUCCESS)
}

fn active_label(item: &ArtifactInfo) -> &'static str {
    match item.active {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

fn vcs_label(vcs: &VcsState) -> String {
    match vcs {
        VcsState::Untracked => "untracked".to_owned(),
        VcsState::TrackedNoRemote => "local only".to_owned(),
        VcsState::TrackedWithRemote { url, sync } => format!("{url} ({sync})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wpstack_core::SyncState;

    #[test]
    fn vcs_labels() {
        assert_eq!(vcs_label(&VcsState::Untracked), "untracked");
        let label = vcs_label(&VcsState::TrackedWithRemote {
            url: "git@host:me/x.git".to_owned(),
            sync: SyncState::Behind { commits: 2 },
        });
        assert_eq!(label, "git@host:me/x.git (2 behind)");
    }
}

//! End-to-end workflows driven through the command layer

use std::fs;
use std::path::Path;

use easy_dev::commands::{
    ConfigPublishCommand, MakeCrudCommand, MakeModelRelationCommand, Project, RelationsListCommand,
    SyncModelRelationsCommand, TemplatesPublishCommand,
};
use easy_dev::exit_code_for;
use easy_dev::scaffold::{ArtifactKind, EntityName};
use tempfile::TempDir;

fn project(dir: &TempDir) -> Project {
    Project::open(dir.path(), None).unwrap()
}

fn crud(project: &Project, entity: &str, fields: &[&str]) -> anyhow::Result<()> {
    let fields = fields.iter().map(|f| (*f).to_string()).collect();
    MakeCrudCommand::new(entity.to_string(), fields, false)
        .execute(project)
        .map(|_| ())
}

fn relate(project: &Project, a: &str, b: &str, kind: &str) -> anyhow::Result<()> {
    MakeModelRelationCommand::new(a.to_string(), b.to_string(), kind.to_string(), false)
        .execute(project)
        .map(|_| ())
}

fn sync(project: &Project, force: bool) -> anyhow::Result<easy_dev::relations::SyncOutcome> {
    SyncModelRelationsCommand::new(force, false).execute(project)
}

fn model(dir: &TempDir, snake: &str) -> String {
    fs::read_to_string(dir.path().join("src/models").join(format!("{snake}.rs"))).unwrap()
}

fn entity(name: &str) -> EntityName {
    EntityName::parse(name).unwrap()
}

/// Regenerating without --force leaves every artifact and hash untouched
#[test]
fn test_regenerate_without_force_conflicts() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    crud(&project, "Post", &["title:string", "body:text"]).unwrap();
    let manifest = project.manifest().unwrap();
    assert_eq!(manifest.len(), 4);
    let before = model(&dir, "post");

    let err = crud(&project, "Post", &["title:string", "body:text"]).unwrap_err();
    assert_eq!(exit_code_for(&err), 4);
    assert_eq!(project.manifest().unwrap(), manifest);
    assert_eq!(model(&dir, "post"), before);
}

/// Invalid definitions are validation errors and write nothing
#[test]
fn test_invalid_definitions_write_nothing() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    let err = crud(&project, "post", &["title:string"]).unwrap_err();
    assert_eq!(exit_code_for(&err), 2);

    let err = crud(&project, "Post", &["title:blob"]).unwrap_err();
    assert_eq!(exit_code_for(&err), 2);

    let err = crud(&project, "Post", &["title:string", "title:text"]).unwrap_err();
    assert_eq!(exit_code_for(&err), 2);

    assert!(project.manifest().unwrap().is_empty());
    assert!(!dir.path().join("src").exists());
}

/// A contradicting relation is rejected and the graph stays as it was
#[test]
fn test_contradicting_relation_leaves_graph_unchanged() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    let before = project.relation_store().load().unwrap().relations();

    let err = relate(&project, "Comment", "Post", "one-to-many").unwrap_err();
    assert_eq!(exit_code_for(&err), 3);

    let err = relate(&project, "Post", "Comment", "has-many").unwrap_err();
    assert_eq!(exit_code_for(&err), 3);

    assert_eq!(project.relation_store().load().unwrap().relations(), before);
}

/// Removing an undeclared relation is a relation conflict
#[test]
fn test_remove_unknown_relation() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    let err = MakeModelRelationCommand::new(
        "Post".to_string(),
        "Comment".to_string(),
        "one-to-many".to_string(),
        true,
    )
    .execute(&project)
    .unwrap_err();
    assert_eq!(exit_code_for(&err), 3);

    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    MakeModelRelationCommand::new(
        "Post".to_string(),
        "Comment".to_string(),
        "one-to-many".to_string(),
        true,
    )
    .execute(&project)
    .unwrap();
    assert!(project.relation_store().load().unwrap().is_empty());
}

/// Post has many comments: both models get their accessor after a sync
#[test]
fn test_post_comment_scenario() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    crud(&project, "Post", &["title:string"]).unwrap();
    crud(&project, "Comment", &["body:text"]).unwrap();
    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    relate(&project, "Post", "Tag", "many-to-many").unwrap();

    let outcome = sync(&project, false).unwrap();
    assert_eq!(outcome.updated.len(), 2);

    let post = model(&dir, "post");
    assert!(post.contains("pub fn comments(&self) -> HasMany<Comment> {"));
    assert!(post.contains("pub fn tags(&self) -> BelongsToMany<Tag> {"));
    let comments_at = post.find("pub fn comments").unwrap();
    let tags_at = post.find("pub fn tags").unwrap();
    assert!(comments_at < tags_at);

    let comment = model(&dir, "comment");
    assert!(comment.contains("pub fn post(&self) -> BelongsTo<Post> {"));

    let listed = RelationsListCommand::new(Some("Post".to_string()))
        .execute(&project)
        .unwrap();
    assert_eq!(listed.len(), 3);
}

/// A second sync is a no-op and leaves the bytes alone
#[test]
fn test_sync_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    crud(&project, "Post", &["title:string"]).unwrap();
    crud(&project, "Comment", &["body:text"]).unwrap();
    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    sync(&project, false).unwrap();

    let post = model(&dir, "post");
    let comment = model(&dir, "comment");
    let manifest = project.manifest().unwrap();

    let outcome = sync(&project, false).unwrap();
    assert!(outcome.is_noop());
    assert_eq!(model(&dir, "post"), post);
    assert_eq!(model(&dir, "comment"), comment);
    assert_eq!(project.manifest().unwrap(), manifest);
}

/// Entities generated after the relation was declared already carry it
#[test]
fn test_relation_declared_before_generation() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    crud(&project, "Comment", &["body:text"]).unwrap();

    let comment = model(&dir, "comment");
    assert!(comment.contains("    pub post_id: i64,\n"));
    assert!(comment.contains("pub fn post(&self) -> BelongsTo<Post> {"));
    assert!(sync(&project, false).unwrap().is_noop());
}

/// Hand edits outside the block need --force; the edit itself survives
#[test]
fn test_sync_modified_model_requires_force() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    crud(&project, "Post", &["title:string"]).unwrap();
    let path = dir.path().join("src/models/post.rs");
    let edited = model(&dir, "post").replace("pub struct Post {", "pub struct Post { // edited");
    fs::write(&path, &edited).unwrap();

    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    let err = sync(&project, false).unwrap_err();
    assert_eq!(exit_code_for(&err), 4);
    assert_eq!(fs::read_to_string(&path).unwrap(), edited);

    let outcome = sync(&project, true).unwrap();
    assert_eq!(outcome.updated.len(), 1);
    let synced = fs::read_to_string(&path).unwrap();
    assert!(synced.contains("// edited"));
    assert!(synced.contains("pub fn comments(&self) -> HasMany<Comment> {"));
}

/// A model without markers fails the whole sync
#[test]
fn test_sync_missing_markers() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    crud(&project, "Post", &["title:string"]).unwrap();
    crud(&project, "Comment", &["body:text"]).unwrap();
    let post_path = dir.path().join("src/models/post.rs");
    let stripped: String = model(&dir, "post")
        .lines()
        .filter(|line| !line.contains("easy-dev:relations"))
        .map(|line| format!("{line}\n"))
        .collect();
    fs::write(&post_path, &stripped).unwrap();
    let comment_before = model(&dir, "comment");

    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    let err = sync(&project, true).unwrap_err();
    assert_eq!(exit_code_for(&err), 5);
    assert_eq!(fs::read_to_string(&post_path).unwrap(), stripped);
    assert_eq!(model(&dir, "comment"), comment_before);
}

/// Dry runs report the diff without writing
#[test]
fn test_sync_dry_run() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    crud(&project, "Post", &["title:string"]).unwrap();
    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    let before = model(&dir, "post");

    let outcome = SyncModelRelationsCommand::new(false, true)
        .execute(&project)
        .unwrap();
    assert!(outcome.dry_run);
    assert!(outcome.updated.is_empty());
    assert_eq!(outcome.planned.len(), 1);
    assert!(outcome.planned[0]
        .unified_diff()
        .contains("+    pub fn comments(&self) -> HasMany<Comment> {"));
    assert_eq!(model(&dir, "post"), before);
}

/// Concurrent declarations serialize on the state lock and both persist
#[test]
fn test_concurrent_relation_declarations() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    let pairs = [
        ("Post", "Comment", "one-to-many"),
        ("Post", "Tag", "many-to-many"),
        ("User", "Post", "one-to-many"),
        ("User", "Profile", "one-to-one"),
    ];
    let handles: Vec<_> = pairs
        .iter()
        .map(|&(a, b, kind)| {
            let project = project.clone();
            std::thread::spawn(move || relate(&project, a, b, kind))
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let graph = project.relation_store().load().unwrap();
    graph.check_consistency().unwrap();
    assert_eq!(graph.relations_for(&entity("Post")).len(), 5);
    assert_eq!(graph.accessors_for(&entity("User")).len(), 2);
}

/// Published templates override the embedded ones
#[test]
fn test_published_templates_are_used() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("easy-dev.toml"),
        "templates_path = \"templates/easy-dev\"\n",
    )
    .unwrap();
    let project = project(&dir);

    let written = TemplatesPublishCommand::new(None, false)
        .execute(&project)
        .unwrap();
    assert_eq!(written.len(), 5);

    let template = dir.path().join("templates/easy-dev/model.jinja");
    let original = fs::read_to_string(&template).unwrap();
    fs::write(&template, format!("// house style\n{original}")).unwrap();

    crud(&project, "Post", &["title:string"]).unwrap();
    assert!(model(&dir, "post").starts_with("// house style\n"));

    let err = TemplatesPublishCommand::new(None, false)
        .execute(&project)
        .unwrap_err();
    assert_eq!(exit_code_for(&err), 4);
}

/// Configured output paths decide where artifacts land
#[test]
fn test_configured_output_paths() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("easy-dev.toml"),
        "[output_paths]\nmodel = \"app/entities\"\n",
    )
    .unwrap();
    let project = project(&dir);

    crud(&project, "Post", &["title:string"]).unwrap();
    let model = project
        .manifest()
        .unwrap()
        .find(&entity("Post"), ArtifactKind::Model)
        .map(|artifact| artifact.path.clone())
        .unwrap();
    assert_eq!(model, Path::new("app/entities/post.rs"));
    assert!(dir.path().join(&model).exists());
}

/// config:publish refuses to overwrite unless forced
#[test]
fn test_config_publish() {
    let dir = TempDir::new().unwrap();

    let path = ConfigPublishCommand::new(false).execute(dir.path()).unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("lock_timeout_ms = 5000"));

    let err = ConfigPublishCommand::new(false)
        .execute(dir.path())
        .unwrap_err();
    assert_eq!(exit_code_for(&err), 4);
    ConfigPublishCommand::new(true).execute(dir.path()).unwrap();

    // The published file loads back
    Project::open(dir.path(), None).unwrap();
}

/// A broken configuration file is a configuration error
#[test]
fn test_invalid_configuration() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("easy-dev.toml"), "field_types = []\n").unwrap();

    let err = anyhow::Error::from(Project::open(dir.path(), None).unwrap_err());
    assert_eq!(exit_code_for(&err), 8);
}

/// Sync rewrites the block without touching the model's permissions
#[cfg(unix)]
#[test]
fn test_sync_keeps_model_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    crud(&project, "Post", &["title:string"]).unwrap();
    let path = dir.path().join("src/models/post.rs");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    assert_eq!(sync(&project, false).unwrap().updated.len(), 1);

    assert!(model(&dir, "post").contains("pub fn comments(&self) -> HasMany<Comment> {"));
    assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o644);
}

/// Names the generated files already use cannot become entities
#[test]
fn test_entity_names_clashing_with_generated_items() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    for name in ["HasMany", "FieldError", "Field"] {
        let err = crud(&project, name, &["title:string"]).unwrap_err();
        assert_eq!(exit_code_for(&err), 2, "{name}");
    }
    assert!(project.manifest().unwrap().is_empty());
}

/// A relation file that breaks the pairing rules is corrupted state
#[test]
fn test_inconsistent_relation_file_is_corrupt_state() {
    let dir = TempDir::new().unwrap();
    let project = project(&dir);

    relate(&project, "Post", "Comment", "one-to-many").unwrap();
    let path = project.state().relations_path();
    let first_line = fs::read_to_string(&path).unwrap().lines().next().unwrap().to_string();
    fs::write(&path, format!("{first_line}\n")).unwrap();

    let err = relate(&project, "Post", "Tag", "many-to-many").unwrap_err();
    assert_eq!(exit_code_for(&err), 9);
}

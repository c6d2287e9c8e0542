use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use color_eyre::eyre::Report;
use stratum_loader::{Error, ManagerKind, ModContainer, RuntimeContext, StaticResourceLoader};
use stratum_resource::{Domain, Environment, Identifier};
use tempdir::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const TEMPDIR_PREFIX: &str = "stratum-static-test";

/// The loader registry is process-wide state, so every test in this file
/// takes the lock, resets the registry and builds its own runtime root.
static LOCK: Mutex<()> = Mutex::new(());

fn isolated() -> MutexGuard<'static, ()> {
    let guard = LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    StaticResourceLoader::reset();
    guard
}

fn write_file(path: &Path, contents: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn server_context(root: &Path) -> RuntimeContext {
    RuntimeContext::new(root, Environment::Server)
}

#[test]
fn memoization_returns_the_same_instance() -> Result<(), Report> {
    let _guard = isolated();
    let dir = TempDir::new(TEMPDIR_PREFIX)?;
    write_file(
        &dir.path().join("static/data/mypack/data/foo/x.json"),
        "first snapshot",
    );

    let context = server_context(dir.path());
    let first = StaticResourceLoader::get(Domain::Data, &context)?;
    let second = StaticResourceLoader::get(Domain::Data, &context)?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.manager().kind(), ManagerKind::Static);

    let id: Identifier = "foo:x.json".parse()?;
    assert_eq!(first.get_resource_or_error(&id)?.read_to_string()?, "first snapshot");

    // The pack set was frozen at construction: packs appearing on disk
    // afterwards are invisible to the memoized instance.
    write_file(
        &dir.path().join("static/data/latecomer/data/late/y.json"),
        "too late",
    );
    let third = StaticResourceLoader::get(Domain::Data, &context)?;
    assert!(Arc::ptr_eq(&first, &third));
    assert!(!third.namespaces().contains(&"late".to_owned()));
    Ok(())
}

#[test]
fn client_assets_are_unavailable_on_a_server() -> Result<(), Report> {
    let _guard = isolated();
    let dir = TempDir::new(TEMPDIR_PREFIX)?;
    let context = server_context(dir.path());

    let refused = StaticResourceLoader::get(Domain::Assets, &context);
    assert!(matches!(
        refused,
        Err(Error::Environment {
            domain: Domain::Assets,
            environment: Environment::Server,
        })
    ));

    // No instance was constructed: not even the scaffold directory exists.
    assert!(!dir.path().join("static/assets").exists());

    // The same domain works fine on a client.
    let client = RuntimeContext::new(dir.path(), Environment::Client);
    let loader = StaticResourceLoader::get(Domain::Assets, &client)?;
    assert_eq!(loader.manager().domain(), Domain::Assets);
    Ok(())
}

#[test]
fn missing_scaffold_directory_is_created() -> Result<(), Report> {
    let _guard = isolated();
    let dir = TempDir::new(TEMPDIR_PREFIX)?;

    let loader = StaticResourceLoader::get(Domain::Data, &server_context(dir.path()))?;
    assert!(loader.packs().is_empty());
    assert!(dir.path().join("static/data").is_dir());
    Ok(())
}

#[test]
fn discovery_order_is_primary_then_legacy_then_mods() -> Result<(), Report> {
    let _guard = isolated();
    let dir = TempDir::new(TEMPDIR_PREFIX)?;
    write_file(
        &dir.path().join("static/data/primary/data/foo/x.json"),
        "primary",
    );
    write_file(
        &dir.path().join("resources/static/data/legacy/data/foo/x.json"),
        "legacy",
    );
    let mod_root = dir.path().join("mods/somemod");
    write_file(&mod_root.join("static/data/bundled/data/foo/x.json"), "mod");

    let context = server_context(dir.path())
        .with_mods(vec![ModContainer::new("somemod", &mod_root)]);
    let loader = StaticResourceLoader::get(Domain::Data, &context)?;

    let names: Vec<String> = loader
        .packs()
        .iter()
        .map(|pack| pack.name().to_owned())
        .collect();
    assert_eq!(names, ["primary", "legacy", "bundled"]);

    // Later locations override earlier ones for single-resource resolution,
    // and the full stack is visible oldest-first.
    let id: Identifier = "foo:x.json".parse()?;
    assert_eq!(loader.get_resource_or_error(&id)?.read_to_string()?, "mod");
    let layers: Vec<String> = loader
        .get_all_resources(&id)
        .iter()
        .map(|resource| resource.read_to_string().unwrap())
        .collect();
    assert_eq!(layers, ["primary", "legacy", "mod"]);
    Ok(())
}

#[test]
fn archives_load_and_loose_files_are_skipped() -> Result<(), Report> {
    let _guard = isolated();
    let dir = TempDir::new(TEMPDIR_PREFIX)?;
    let static_data = dir.path().join("static/data");
    fs::create_dir_all(&static_data)?;

    let mut writer = ZipWriter::new(fs::File::create(static_data.join("zipped.zip"))?);
    writer.start_file("data/foo/z.json", SimpleFileOptions::default())?;
    writer.write_all(b"zipped content")?;
    writer.finish()?;

    // A stray file at pack depth is not a pack; it must be skipped without
    // failing discovery.
    fs::write(static_data.join("README.txt"), "not a pack")?;

    let loader = StaticResourceLoader::get(Domain::Data, &server_context(dir.path()))?;
    assert_eq!(loader.packs().len(), 1);

    let id: Identifier = "foo:z.json".parse()?;
    assert_eq!(loader.get_resource_or_error(&id)?.read_to_string()?, "zipped content");
    Ok(())
}

#[test]
fn trailing_separator_is_rejected_through_the_loader() -> Result<(), Report> {
    let _guard = isolated();
    let dir = TempDir::new(TEMPDIR_PREFIX)?;
    let loader = StaticResourceLoader::get(Domain::Data, &server_context(dir.path()))?;

    let refused = loader.find_resources("recipes/", |_| true);
    assert!(matches!(refused, Err(Error::TrailingSeparator { .. })));
    Ok(())
}

#[test]
fn json_aggregation_skips_unparsable_documents() -> Result<(), Report> {
    let _guard = isolated();
    let dir = TempDir::new(TEMPDIR_PREFIX)?;
    let pack_root = dir.path().join("static/data/jsons");
    write_file(&pack_root.join("data/foo/docs/good.json"), r#"{"ok": true}"#);
    write_file(&pack_root.join("data/foo/docs/broken.json"), "{ not json");
    write_file(&pack_root.join("data/foo/docs/note.txt"), "not json at all");
    write_file(&pack_root.join("data/bar/docs/other.json"), "[1, 2, 3]");

    let loader = StaticResourceLoader::get(Domain::Data, &server_context(dir.path()))?;

    let all = loader.find_json_documents(None, None)?;
    let ids: Vec<String> = all.keys().map(ToString::to_string).collect();
    assert_eq!(ids, ["bar:docs/other.json", "foo:docs/good.json"]);
    let good: Identifier = "foo:docs/good.json".parse()?;
    assert_eq!(all[&good]["ok"], true);

    let foo_only = loader.find_json_documents(Some("foo"), Some("docs"))?;
    assert_eq!(foo_only.len(), 1);

    // An empty namespace restriction means "no restriction".
    let unrestricted = loader.find_json_documents(Some(""), None)?;
    assert_eq!(unrestricted.len(), 2);
    Ok(())
}

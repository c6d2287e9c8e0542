use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use color_eyre::eyre::Report;
use rstest::{fixture, rstest};
use stratum_pack::{DirectoryPack, PackSource, Resource, ZipPack};
use stratum_resource::{Domain, Identifier};
use tempdir::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const TEMPDIR_PREFIX: &str = "stratum-pack-test";

/// Entries shared by the directory-backed and the zip-backed test packs.
const ENTRIES: &[(&str, &str)] = &[
    ("assets/foo/lang/en_us.json", r#"{"hello": "world"}"#),
    ("data/foo/recipes/a.json", r#"{"recipe": "a"}"#),
    ("data/foo/recipes/deep/b.json", r#"{"recipe": "b"}"#),
    ("data/foo/tags/c.json", r#"{"tag": "c"}"#),
    ("data/bar/x.json", r#"{"x": true}"#),
];

const METADATA: &str = r#"{"pack": {"description": "test pack"}, "filter": {"block": [{"namespace": "bar"}]}}"#;

#[derive(Debug)]
#[must_use]
pub struct Inputs {
    pub dir: TempDir,
}

impl Inputs {
    pub fn directory_pack(&self) -> DirectoryPack {
        DirectoryPack::new("test-dir-pack", self.dir.path().join("pack"))
    }

    pub fn zip_pack(&self) -> ZipPack {
        ZipPack::open("test-zip-pack", self.dir.path().join("pack.zip")).unwrap()
    }
}

fn write_tree(root: &Path) {
    for (entry, contents) in ENTRIES {
        let path = root.join(entry);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    fs::write(root.join("pack.json"), METADATA).unwrap();
}

fn write_zip(path: &Path) {
    let mut writer = ZipWriter::new(fs::File::create(path).unwrap());
    let options = SimpleFileOptions::default();
    for (entry, contents) in ENTRIES {
        writer.start_file(*entry, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.start_file("pack.json", options).unwrap();
    writer.write_all(METADATA.as_bytes()).unwrap();
    writer.finish().unwrap();
}

#[fixture]
fn inputs() -> Inputs {
    let dir = TempDir::new(TEMPDIR_PREFIX).unwrap();
    write_tree(&dir.path().join("pack"));
    write_zip(&dir.path().join("pack.zip"));
    Inputs { dir }
}

fn packs(inputs: &Inputs) -> Vec<Arc<dyn PackSource>> {
    vec![
        Arc::new(inputs.directory_pack()),
        Arc::new(inputs.zip_pack()),
    ]
}

#[rstest]
fn namespaces_per_domain(inputs: Inputs) {
    for pack in packs(&inputs) {
        assert_eq!(pack.namespaces(Domain::Assets), ["foo"], "{}", pack.name());
        assert_eq!(pack.namespaces(Domain::Data), ["bar", "foo"], "{}", pack.name());
    }
}

#[rstest]
fn contains_and_open(inputs: Inputs) -> Result<(), Report> {
    let id: Identifier = "foo:recipes/a.json".parse()?;
    let missing: Identifier = "foo:recipes/missing.json".parse()?;

    for pack in packs(&inputs) {
        assert!(pack.contains(Domain::Data, &id));
        assert!(!pack.contains(Domain::Assets, &id));
        assert!(!pack.contains(Domain::Data, &missing));
        assert!(pack.open(Domain::Data, &missing).is_none());

        let resource = Resource::new(Arc::clone(&pack), Domain::Data, id.clone());
        assert_eq!(resource.read_to_string()?, r#"{"recipe": "a"}"#);
        assert_eq!(resource.source_name(), pack.name());
    }

    Ok(())
}

#[rstest]
fn list_respects_the_prefix_boundary(inputs: Inputs) {
    for pack in packs(&inputs) {
        let under_recipes = pack.list(Domain::Data, "foo", "recipes");
        let listed: Vec<String> = under_recipes.iter().map(ToString::to_string).collect();
        assert_eq!(
            listed,
            ["foo:recipes/a.json", "foo:recipes/deep/b.json"],
            "{}",
            pack.name()
        );

        // `recipes` is a directory prefix, not a string prefix: `tags`
        // content must not leak in, and a bogus prefix yields nothing.
        assert!(pack.list(Domain::Data, "foo", "recipe").is_empty());
        assert!(pack.list(Domain::Data, "foo", "nope").is_empty());
    }
}

#[rstest]
fn list_with_empty_prefix_enumerates_the_namespace(inputs: Inputs) {
    for pack in packs(&inputs) {
        let everything = pack.list(Domain::Data, "foo", "");
        assert_eq!(everything.len(), 3, "{}", pack.name());
        let bar = pack.list(Domain::Data, "bar", "");
        assert_eq!(bar.len(), 1, "{}", pack.name());
    }
}

#[rstest]
fn metadata_and_filter(inputs: Inputs) -> Result<(), Report> {
    for pack in packs(&inputs) {
        let meta = pack.metadata()?.expect("both test packs carry metadata");
        assert_eq!(
            meta.pack.as_ref().and_then(|section| section.description.as_deref()),
            Some("test pack")
        );

        let filter = meta.compile_filter()?.expect("metadata carries a filter");
        assert!(filter.blocks_namespace("bar"));
        assert!(!filter.allows("bar", "x.json"));
        assert!(filter.allows("foo", "recipes/a.json"));
    }

    Ok(())
}

#[rstest]
fn malformed_metadata_is_an_error(inputs: Inputs) {
    let root = inputs.dir.path().join("broken");
    write_tree(&root);
    fs::write(root.join("pack.json"), "{ not json").unwrap();

    let pack = DirectoryPack::new("broken", &root);
    assert!(pack.metadata().is_err());
    // The rest of the pack stays readable regardless.
    assert_eq!(pack.namespaces(Domain::Data), ["bar", "foo"]);
}

#[rstest]
fn absent_metadata_is_not_an_error(inputs: Inputs) -> Result<(), Report> {
    let root = inputs.dir.path().join("bare");
    fs::create_dir_all(root.join("data/foo"))?;
    fs::write(root.join("data/foo/y.json"), "{}")?;

    let pack = DirectoryPack::new("bare", &root);
    assert!(pack.metadata()?.is_none());
    Ok(())
}

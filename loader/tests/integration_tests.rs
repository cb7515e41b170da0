use std::ffi::OsString;
use std::fs;
use std::path::Path;

use paf_policy_core::{ErrorCode, PolicyError};
use paf_policy_loader::{DefaultPolicyFile, LoadConfig, LoaderError, PolicyLoader};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const DICTIONARY: &str = "\
target: pipeline
definitions: {
    name: {
        type: string
        minOccurs: 1
        maxOccurs: 1
    }
    threads: {
        type: int
        default: 4
        allowed: {
            min: 1
            max: 64
        }
    }
    calib: {
        type: Policy
        dictionaryFile: calib_dict.paf
    }
}
";

const CALIB_DICTIONARY: &str = "\
definitions: {
    bias: {
        type: bool
        default: true
    }
    flat: {
        type: string
    }
}
";

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn product_lookup(dir: &Path) -> impl Fn(&str) -> Option<OsString> + '_ {
    move |variable| (variable == "PIPE_TASKS_DIR").then(|| dir.as_os_str().to_os_string())
}

fn pipeline_tree(dir: &Path) {
    write(dir, "pipeline_dict.paf", DICTIONARY);
    write(dir, "calib_dict.paf", CALIB_DICTIONARY);
    write(dir, "pipeline.paf", "name: nightly\ncalib: @calib.paf\n");
    write(dir, "calib.paf", "flat: \"dome\"\n");
}

// ---------------------------------------------------------------------------
// Builder loads
// ---------------------------------------------------------------------------

#[test]
fn test_load_with_includes_defaults_and_dictionary_files() {
    let dir = tempfile::tempdir().unwrap();
    pipeline_tree(dir.path());

    let loaded = PolicyLoader::new()
        .policy(dir.path().join("pipeline.paf"))
        .dictionary(dir.path().join("pipeline_dict.paf"))
        .load()
        .unwrap();

    assert!(loaded.is_valid(), "{}", loaded.validation);
    // calib.paf from the policy, calib_dict.paf from the dictionary
    assert_eq!(loaded.files_loaded, 2);

    let policy = &loaded.policy;
    assert_eq!(policy.get_string("name").unwrap(), "nightly");
    assert_eq!(policy.get_int("threads").unwrap(), 4);
    assert_eq!(policy.get_string("calib.flat").unwrap(), "dome");
    assert!(policy.get_bool("calib.bias").unwrap());
    assert!(policy.can_validate());
}

#[test]
fn test_validation_failures_are_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    pipeline_tree(dir.path());
    write(dir.path(), "bad.paf", "threads: 100\nextra: 1\n");

    let loaded = PolicyLoader::new()
        .policy(dir.path().join("bad.paf"))
        .dictionary(dir.path().join("pipeline_dict.paf"))
        .load()
        .unwrap();

    assert!(!loaded.is_valid());
    assert_eq!(loaded.validation.errors("name"), ErrorCode::MISSING_REQUIRED);
    assert_eq!(loaded.validation.errors("threads"), ErrorCode::VALUE_OUT_OF_RANGE);
    assert_eq!(loaded.validation.errors("extra"), ErrorCode::UNKNOWN_NAME);
}

#[test]
fn test_missing_reference_strict_and_lenient() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.paf", "name: x\nsub: @missing.paf\n");

    let err = PolicyLoader::new()
        .policy(dir.path().join("main.paf"))
        .load()
        .unwrap_err();
    assert!(matches!(err, LoaderError::Policy(PolicyError::Io { .. })));

    let loaded = PolicyLoader::new()
        .policy(dir.path().join("main.paf"))
        .strict(false)
        .load()
        .unwrap();
    assert!(loaded.policy.is_policy("sub"));
    assert!(loaded.policy.get_policy("sub").unwrap().borrow().is_empty());
    assert_eq!(loaded.files_loaded, 1);
}

#[test]
fn test_explicit_repository_for_text_input() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "shared/io.paf", "buffer: 1024\n");

    let loaded = PolicyLoader::new()
        .policy_str("io: @shared/io.paf\n")
        .repository(dir.path())
        .load()
        .unwrap();
    assert_eq!(loaded.policy.get_int("io.buffer").unwrap(), 1024);
}

// ---------------------------------------------------------------------------
// YAML configuration
// ---------------------------------------------------------------------------

#[test]
fn test_config_relative_to_its_directory() {
    let dir = tempfile::tempdir().unwrap();
    pipeline_tree(&dir.path().join("conf"));
    write(
        dir.path(),
        "load.yaml",
        "policy: conf/pipeline.paf\ndictionary: conf/pipeline_dict.paf\n",
    );

    let config = LoadConfig::load(dir.path().join("load.yaml")).unwrap();
    let loaded = PolicyLoader::from_config(&config).unwrap().load().unwrap();
    assert!(loaded.is_valid(), "{}", loaded.validation);
    assert_eq!(loaded.policy.get_string("calib.flat").unwrap(), "dome");
}

#[test]
fn test_config_with_product_repository() {
    let product = tempfile::tempdir().unwrap();
    write(product.path(), "policy/calib.paf", "flat: \"sky\"\n");

    let work = tempfile::tempdir().unwrap();
    write(work.path(), "main.paf", "name: run\ncalib: @calib.paf\n");
    write(
        work.path(),
        "load.yaml",
        "policy: main.paf\nproduct: pipe_tasks\nrepository: policy\nkeep_for_validation: false\n",
    );

    let config = LoadConfig::load(work.path().join("load.yaml")).unwrap();
    let loader = PolicyLoader::from_config_with(&config, product_lookup(product.path())).unwrap();
    let loaded = loader.load().unwrap();
    assert_eq!(loaded.policy.get_string("calib.flat").unwrap(), "sky");

    let err = PolicyLoader::from_config_with(&config, |_| None).unwrap_err();
    assert!(matches!(err, LoaderError::RepositoryNotFound { .. }));
}

#[test]
fn test_bad_yaml_config() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "load.yaml", "policy: [unclosed\n");
    assert!(matches!(
        LoadConfig::load(dir.path().join("load.yaml")),
        Err(LoaderError::Yaml(_))
    ));
    assert!(matches!(
        LoadConfig::load(dir.path().join("absent.yaml")),
        Err(LoaderError::Io(_))
    ));
}

// ---------------------------------------------------------------------------
// Default policy files
// ---------------------------------------------------------------------------

#[test]
fn test_default_policy_file_merges_into_user_policy() {
    let product = tempfile::tempdir().unwrap();
    write(product.path(), "policy/defaults.paf", "threads: 8\nname: default\n");

    let defaults =
        DefaultPolicyFile::with_lookup("pipe_tasks", "policy/defaults.paf", product_lookup(product.path()))
            .unwrap()
            .load(true)
            .unwrap();

    let mut policy = paf_policy_core::Policy::parse_str("name: mine\n").unwrap();
    let copied = policy.merge_defaults(&defaults, false, None).unwrap();
    assert_eq!(copied, 1);
    assert_eq!(policy.get_string("name").unwrap(), "mine");
    assert_eq!(policy.get_int("threads").unwrap(), 8);
}

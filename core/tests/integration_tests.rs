use std::fs;
use std::path::Path;

use paf_policy_core::{
    Dictionary, ErrorCode, ParseErrorKind, ParserOptions, Policy, PolicyError, PolicyFile,
    PolicySource, PolicyString, ValidationError, ValueType, extract_defaults,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn write(dir: &Path, name: &str, text: &str) {
    fs::write(dir.join(name), text).unwrap();
}

fn single_occurrence_dictionary() -> Dictionary {
    Dictionary::parse_str(
        "\
definitions: {
    n: {
        type: int
        minOccurs: 1
        maxOccurs: 1
    }
}
",
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Store round trips
// ---------------------------------------------------------------------------

#[test]
fn test_set_get_roundtrip_for_every_type() {
    let mut policy = Policy::new();
    policy.set("flag", true).unwrap();
    policy.set("count", -7).unwrap();
    policy.set("ratio", 0.25).unwrap();
    policy.set("label", "stack").unwrap();
    policy.set("deep.er.name", "x").unwrap();

    assert!(policy.get_bool("flag").unwrap());
    assert_eq!(policy.get_int("count").unwrap(), -7);
    assert_eq!(policy.get_double("ratio").unwrap(), 0.25);
    assert_eq!(policy.get_string("label").unwrap(), "stack");
    assert_eq!(policy.get_string("deep.er.name").unwrap(), "x");

    for name in ["flag", "count", "ratio", "label", "deep", "deep.er", "deep.er.name"] {
        assert!(policy.exists(name), "{name} should exist");
    }
    assert!(policy.is_policy("deep.er"));
}

#[test]
fn test_set_replaces_whole_array() {
    let mut policy = Policy::parse_str("a: 1 2 3\n").unwrap();
    policy.set("a", 9).unwrap();
    assert_eq!(policy.value_count("a"), 1);
    assert_eq!(policy.get_int_array("a").unwrap(), vec![9]);
}

#[test]
fn test_add_counts_and_order() {
    let mut policy = Policy::new();
    for word in ["one", "two", "three", "four"] {
        policy.add("words", word).unwrap();
    }
    assert_eq!(policy.value_count("words"), 4);
    assert!(policy.is_array("words"));
    assert_eq!(
        policy.get_string_array("words").unwrap(),
        vec!["one", "two", "three", "four"]
    );
    assert_eq!(policy.get_string("words").unwrap(), "four");

    let err = policy.add("words", 5).unwrap_err();
    assert!(err.is_type_error());
    assert_eq!(policy.value_count("words"), 4);
}

#[test]
fn test_unknown_names_are_quiet() {
    let policy = Policy::parse_str("a: 1\n").unwrap();
    assert!(!policy.exists("b"));
    assert!(!policy.exists("a.b"));
    assert_eq!(policy.value_count("missing"), 0);
    assert!(!policy.is_int("missing"));
    assert!(!policy.is_policy("missing"));
    assert_eq!(policy.value_type("missing"), None);

    assert!(matches!(policy.get_int("b"), Err(PolicyError::NameNotFound(_))));
    assert!(matches!(
        policy.get_string("a"),
        Err(PolicyError::TypeError { expected: ValueType::String, actual: ValueType::Int, .. })
    ));
    assert!(matches!(policy.get_int("a.b"), Err(PolicyError::NotAPolicy { .. })));
    assert!(matches!(policy.get_int("a..b"), Err(PolicyError::BadName(_))));
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

#[test]
fn test_parse_int_array() {
    let policy = Policy::parse_str("a: 1 2 3").unwrap();
    assert_eq!(policy.get_int_array("a").unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_parse_multiline_quoted_string() {
    let policy = Policy::parse_str("a: \"hello\n  world\"\n").unwrap();
    assert_eq!(policy.get_string("a").unwrap(), "hello world");
}

#[test]
fn test_parse_nested_block() {
    let policy = Policy::parse_str("a: { b: 1 }\n").unwrap();
    assert!(policy.is_policy("a"));
    assert_eq!(policy.get_int("a.b").unwrap(), 1);
}

#[test]
fn test_parse_full_document() {
    let text = "\
#<?cfg paf policy ?>
# pipeline configuration
name: nightly
exposure: 15.0 30.0
enabled: true
stages: {
    isr: {
        doBias: true
        gain: 1.5e0
    }
    outputs: \"calexp\" 'src'
}
camera: @camera.paf
stages.isr.gain: 2.0
";
    let policy = Policy::parse_str(text).unwrap();

    assert_eq!(policy.get_string("name").unwrap(), "nightly");
    assert_eq!(policy.get_double_array("exposure").unwrap(), vec![15.0, 30.0]);
    assert!(policy.get_bool("enabled").unwrap());
    assert!(policy.get_bool("stages.isr.doBias").unwrap());
    assert_eq!(policy.get_double_array("stages.isr.gain").unwrap(), vec![1.5, 2.0]);
    assert_eq!(
        policy.get_string_array("stages.outputs").unwrap(),
        vec!["calexp", "src"]
    );
    assert!(policy.is_file("camera"));
    assert_eq!(policy.get_file("camera").unwrap().path(), Path::new("camera.paf"));
    assert_eq!(policy.file_names(false), vec!["camera"]);
    assert_eq!(policy.policy_names(true), vec!["stages"]);
}

#[test]
fn test_strict_errors_carry_line_numbers() {
    let err = Policy::parse_str("a: 1\nb: 2 two\n").unwrap_err();
    match err {
        PolicyError::Parse(parse) => {
            assert_eq!(parse.kind, ParseErrorKind::FormatSyntax);
            assert_eq!(parse.line, Some(2));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = Policy::parse_str("a: {\n  b: 1\n").unwrap_err();
    assert!(matches!(err, PolicyError::Parse(ref parse) if parse.kind == ParseErrorKind::Eof));

    let err = Policy::parse_str("a: 1\n}\n").unwrap_err();
    assert!(matches!(err, PolicyError::Parse(ref parse) if parse.kind == ParseErrorKind::Syntax));

    let err = Policy::parse_str("a: 3000000000\n").unwrap_err();
    assert!(
        matches!(err, PolicyError::Parse(ref parse) if parse.kind == ParseErrorKind::UnsupportedSyntax)
    );
}

#[test]
fn test_lenient_parse_keeps_good_values() {
    let mut policy = Policy::new();
    PolicyString::new("a: 1 2 two\n}\nb: true\n")
        .load_into(&mut policy, ParserOptions { strict: false })
        .unwrap();
    assert_eq!(policy.get_int_array("a").unwrap(), vec![1, 2]);
    assert!(policy.get_bool("b").unwrap());
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[test]
fn test_missing_required_and_too_many_values() {
    let dictionary = single_occurrence_dictionary();

    let mut errs = ValidationError::new();
    dictionary
        .validate(&Policy::parse_str("other: 1\n").unwrap(), Some(&mut errs))
        .unwrap();
    assert!(errs.errors("n").contains(ErrorCode::MISSING_REQUIRED));
    assert!(errs.errors("n").intersects(ErrorCode::TOO_FEW_VALUES));
    assert!(errs.errors("other").contains(ErrorCode::UNKNOWN_NAME));

    let mut errs = ValidationError::new();
    dictionary
        .validate(&Policy::parse_str("n: 1 2\n").unwrap(), Some(&mut errs))
        .unwrap();
    assert!(errs.errors("n").contains(ErrorCode::TOO_MANY_VALUES));
    assert_eq!(errs.param_names(), vec!["n"]);
}

#[test]
fn test_validate_without_accumulator_fails_after_full_pass() {
    let dictionary = single_occurrence_dictionary();
    let err = dictionary
        .validate(&Policy::parse_str("n: 1 2\nextra: x\n").unwrap(), None)
        .unwrap_err();
    assert_eq!(err.param_count(), 2);
    assert_eq!(err.errors("extra"), ErrorCode::UNKNOWN_NAME);

    assert!(dictionary.validate(&Policy::parse_str("n: 4\n").unwrap(), None).is_ok());
}

#[test]
fn test_child_definition_and_nested_prefix() {
    let dictionary = Dictionary::parse_str(
        "\
definitions: {
    cameras: {
        type: policy
        dictionary: {
            childDefinition: {
                type: Policy
                dictionary: {
                    definitions: {
                        gain: {
                            type: double
                            allowed: {
                                min: 0.0
                                max: 10.0
                            }
                        }
                    }
                }
            }
        }
    }
}
",
    )
    .unwrap();

    let policy = Policy::parse_str(
        "\
cameras: {
    left: {
        gain: 2.0
    }
    right: {
        gain: 12.0
        mode: fast
    }
}
",
    )
    .unwrap();

    let mut errs = ValidationError::new();
    dictionary.validate(&policy, Some(&mut errs)).unwrap();
    assert_eq!(errs.errors("cameras.right.gain"), ErrorCode::VALUE_OUT_OF_RANGE);
    assert_eq!(errs.errors("cameras.right.mode"), ErrorCode::UNKNOWN_NAME);
    assert!(errs.errors("cameras.left.gain").is_empty());

    assert_eq!(
        dictionary.lookup("cameras.anything.gain").unwrap().value_type(),
        Some(ValueType::Double)
    );
    assert!(matches!(
        dictionary.lookup("cameras.anything.exposure"),
        Err(PolicyError::NameNotFound(_))
    ));
}

#[test]
fn test_allowed_values() {
    let dictionary = Dictionary::parse_str(
        "\
definitions: {
    band: {
        type: string
        allowed: {
            value: \"g\"
        }
        allowed: {
            value: \"r\"
        }
    }
}
",
    )
    .unwrap();

    let mut errs = ValidationError::new();
    dictionary
        .validate(&Policy::parse_str("band: \"g\" \"r\"\n").unwrap(), Some(&mut errs))
        .unwrap();
    assert!(errs.is_empty(), "{errs}");

    dictionary
        .validate(&Policy::parse_str("band: \"g\" \"z\"\n").unwrap(), Some(&mut errs))
        .unwrap();
    assert_eq!(errs.errors("band"), ErrorCode::VALUE_DISALLOWED);
}

#[test]
fn test_error_messages() {
    assert_eq!(
        ValidationError::message_for(ErrorCode::TOO_FEW_VALUES),
        "not enough values for parameter"
    );
    assert_eq!(
        ValidationError::message_for(ErrorCode::MISSING_REQUIRED | ErrorCode::VALUE_DISALLOWED),
        "missing value for required parameter; value is not among the allowed set"
    );
    assert_eq!(ErrorCode::TOO_FEW_VALUES.bits(), 14);
    assert_eq!(ErrorCode::WRONG_OCCURRENCES.bits(), 30);
    assert_eq!(ErrorCode::BAD_VALUE.bits(), 96);
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

#[test]
fn test_attached_dictionary_checks_add() {
    let dictionary = Dictionary::parse_str(
        "\
definitions: {
    retries: {
        type: int
        maxOccurs: 2
        default: 1
    }
}
",
    )
    .unwrap();

    let defaults = extract_defaults(&dictionary, None).unwrap();
    assert_eq!(defaults.get_int("retries").unwrap(), 1);

    let mut policy = Policy::from_dictionary(&dictionary, true, None).unwrap();
    policy.add("retries", 2).unwrap();
    let err = policy.add("retries", 3).unwrap_err();
    assert!(matches!(
        err,
        PolicyError::Validation(errs) if errs.errors("retries") == ErrorCode::TOO_MANY_VALUES
    ));
    assert_eq!(policy.get_int_array("retries").unwrap(), vec![1, 2]);
}

#[test]
fn test_attached_dictionary_accepts_nested_block_with_required_child() {
    let dictionary = Dictionary::parse_str(
        "\
definitions: {
    io: {
        type: Policy
        dictionary: {
            definitions: {
                path: {
                    type: string
                    minOccurs: 1
                }
            }
        }
    }
}
",
    )
    .unwrap();

    let mut policy = Policy::from_dictionary(&dictionary, true, None).unwrap();
    PolicyString::new("io: {\n  path: /tmp\n}\n")
        .load_into(&mut policy, ParserOptions::default())
        .unwrap();
    assert_eq!(policy.get_string("io.path").unwrap(), "/tmp");
    assert!(policy.validate(None).is_ok());

    let mut empty = Policy::from_dictionary(&dictionary, true, None).unwrap();
    empty.set("io", Policy::new()).unwrap();
    let mut errs = ValidationError::new();
    empty.validate(Some(&mut errs)).unwrap();
    assert_eq!(errs.errors("io.path"), ErrorCode::MISSING_REQUIRED);
}

// ---------------------------------------------------------------------------
// File inclusion
// ---------------------------------------------------------------------------

#[test]
fn test_load_policy_files_lenient_and_strict() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "readable.paf", "value: 3\n");

    let text = "part: @unreadable.paf\npart: @readable.paf\n";

    let mut lenient = Policy::parse_str(text).unwrap();
    let attempted = lenient.load_policy_files(dir.path(), false).unwrap();
    assert_eq!(attempted, 2);
    let parts = lenient.get_policy_array("part").unwrap();
    assert_eq!(parts.len(), 2);
    assert!(parts[0].borrow().is_empty());
    assert_eq!(parts[1].borrow().get_int("value").unwrap(), 3);

    let mut strict = Policy::parse_str(text).unwrap();
    let err = strict.load_policy_files(dir.path(), true).unwrap_err();
    match err {
        PolicyError::Io { path, .. } => {
            assert_eq!(path, Some(dir.path().join("unreadable.paf")));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_absolute_reference_and_file_source() {
    let dir = tempfile::tempdir().unwrap();
    let absolute = dir.path().join("abs.paf");
    write(dir.path(), "abs.paf", "#<?cfg paf policy ?>\nx: 1\n");
    write(dir.path(), "main.paf", &format!("inc: @{}\n", absolute.display()));

    let mut policy = Policy::new();
    let parameters = PolicyFile::new(dir.path().join("main.paf"))
        .load_into(&mut policy, ParserOptions::default())
        .unwrap();
    assert_eq!(parameters, 1);

    let elsewhere = tempfile::tempdir().unwrap();
    policy.load_policy_files(elsewhere.path(), true).unwrap();
    assert_eq!(policy.get_int("inc.x").unwrap(), 1);
}

#[test]
fn test_dictionary_file_references() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "io_dict.paf",
        "definitions: {\n    buffer: {\n        type: int\n        default: 512\n    }\n}\n",
    );

    let mut dictionary = Dictionary::parse_str(
        "definitions: {\n    io: {\n        type: policy\n        dictionaryFile: io_dict.paf\n    }\n}\n",
    )
    .unwrap();

    let mut errs = ValidationError::new();
    let defaults = extract_defaults(&dictionary, Some(&mut errs)).unwrap();
    assert!(!defaults.exists("io"));
    assert_eq!(errs.errors("io"), ErrorCode::NOT_LOADED);
    assert!(matches!(
        dictionary.lookup("io.buffer"),
        Err(PolicyError::DictionaryNotLoaded { ref name, .. }) if name == "io"
    ));

    assert_eq!(dictionary.load_policy_files(dir.path(), true).unwrap(), 1);
    let defaults = extract_defaults(&dictionary, None).unwrap();
    assert_eq!(defaults.get_int("io.buffer").unwrap(), 512);
}

// ---------------------------------------------------------------------------
// Copies
// ---------------------------------------------------------------------------

#[test]
fn test_deep_and_shallow_copies() {
    let original = Policy::parse_str("sub: {\n  v: 1\n}\ntop: 1\n").unwrap();
    let deep = original.deep_copy();
    let mut shallow = original.shallow_copy();

    original.get_policy("sub").unwrap().borrow_mut().set("v", 2).unwrap();
    assert_eq!(deep.get_int("sub.v").unwrap(), 1);
    assert_eq!(shallow.get_int("sub.v").unwrap(), 2);

    shallow.set("top", 5).unwrap();
    assert_eq!(original.get_int("top").unwrap(), 1);
}

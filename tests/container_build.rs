//! Module container construction: action indexing, config validation,
//! collisions and exposure options.

mod common;

use serde_json::json;

use rehearse::{
    error::{ConfigError, Error},
    ModuleContainer,
};

use self::common::{registry, suite_config};

#[test]
fn public_actions_are_indexed_to_their_module() {
    let config = suite_config(&["acting"], json!({}));

    let container =
        ModuleContainer::build(&registry(), &config).unwrap();

    let target = container.resolve("check_foo").unwrap();
    assert_eq!(target.module, "acting");
    assert_eq!(target.method, "check_foo");
    assert!(
        container.resolve("descriptor").is_none(),
        "undeclared methods must not be callable as actions",
    );
}

#[test]
fn missing_required_fields_fail_before_initialize() {
    // Scenario B: `rest` requires `url` and none is configured.
    let config = suite_config(
        &["acting", "rest"],
        json!({"acting": {}}),
    );

    let err = ModuleContainer::build(&registry(), &config).unwrap_err();

    match err {
        Error::Config(ConfigError::MissingFields { module, fields }) => {
            assert_eq!(module, "rest");
            assert_eq!(fields, ["url"]);
        }
        other => panic!("expected MissingFields, got: {other}"),
    }
}

#[test]
fn action_collision_is_a_hard_error() {
    // Both `acting` and `rest` declare `login`.
    let config = suite_config(
        &["acting", "rest"],
        json!({"rest": {"url": "http://localhost"}}),
    );

    let err = ModuleContainer::build(&registry(), &config).unwrap_err();

    match err {
        Error::Config(ConfigError::ActionCollision {
            action,
            existing,
            conflicting,
        }) => {
            assert_eq!(action, "login");
            assert_eq!(existing, "acting");
            assert_eq!(conflicting, "rest");
        }
        other => panic!("expected ActionCollision, got: {other}"),
    }
}

#[test]
fn unknown_module_is_a_configuration_error() {
    let config = suite_config(&["selenium"], json!({}));

    let err = ModuleContainer::build(&registry(), &config).unwrap_err();

    assert!(matches!(
        err,
        Error::Config(ConfigError::UnknownModule { module }) if module == "selenium"
    ));
}

#[test]
fn exclude_actions_narrows_the_index() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"exclude_actions": ["check_foo"]}}),
    );

    let container = ModuleContainer::build(&registry(), &config).unwrap();

    assert!(container.resolve("check_foo").is_none());
    assert!(container.resolve("login").is_some());
}

#[test]
fn only_actions_restricts_the_index() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"only_actions": ["login"]}}),
    );

    let container = ModuleContainer::build(&registry(), &config).unwrap();

    assert!(container.resolve("login").is_some());
    assert!(container.resolve("have_user").is_none());
    assert!(container.resolve("see_dashboard").is_none());
}

#[test]
fn aliases_expose_additional_names() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"aliases": {"sign_in": "login"}}}),
    );

    let container = ModuleContainer::build(&registry(), &config).unwrap();

    let alias = container.resolve("sign_in").unwrap();
    assert_eq!(alias.method, "login");
    assert!(container.resolve("login").is_some(), "original stays exposed");
}

#[test]
fn options_referencing_unknown_actions_are_rejected() {
    let config = suite_config(
        &["acting"],
        json!({"acting": {"aliases": {"warp": "teleport"}}}),
    );

    let err = ModuleContainer::build(&registry(), &config).unwrap_err();

    assert!(matches!(
        err,
        Error::Config(ConfigError::UnknownAction { module, action })
            if module == "acting" && action == "teleport"
    ));
}

#[test]
fn enabling_a_module_twice_is_rejected() {
    let config = suite_config(&["acting", "acting"], json!({}));

    let err = ModuleContainer::build(&registry(), &config).unwrap_err();

    assert!(matches!(
        err,
        Error::Config(ConfigError::DuplicateModule { module }) if module == "acting"
    ));
}

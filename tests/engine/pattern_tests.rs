// Tests for folder and ignore rules through the public API

use packsync::logging::RunLog;
use packsync::pattern::PatternMatcher;
use packsync::tree::TreeFilter;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_later_negation_wins() {
    let matcher = PatternMatcher::new(&["a/*", "!a/keep.txt"]);
    assert!(!matcher.should_ignore("a/keep.txt", false));
    assert!(matcher.should_ignore("a/other.txt", false));

    // order matters: a later positive pattern wins again
    let matcher = PatternMatcher::new(&["!a/keep.txt", "a/*"]);
    assert!(matcher.should_ignore("a/keep.txt", false));
}

#[test]
fn test_include_path_by_folder() {
    assert!(PatternMatcher::new(&["mods"]).should_include_path("mods/x.jar"));
    assert!(!PatternMatcher::new(&["config"]).should_include_path("mods/x.jar"));
}

#[test]
fn test_root_files_need_a_literal_rule() {
    assert!(!PatternMatcher::new(&["mods"]).should_include_path("options.txt"));
    assert!(PatternMatcher::new(&["options.txt"]).should_include_path("options.txt"));
}

#[test]
fn test_double_star_spans_directories() {
    let matcher = PatternMatcher::new(&["config/**/*.bak"]);
    assert!(matcher.should_ignore("config/a/b/c.bak", false));
    assert!(!matcher.should_ignore("mods/a/b/c.bak", false));
}

#[test]
fn test_directory_only_pattern() {
    let matcher = PatternMatcher::new(&["cache/"]);
    assert!(matcher.should_ignore("cache", true));
    assert!(!matcher.should_ignore("cache", false));
}

#[test]
fn test_windows_separators_are_normalized() {
    let matcher = PatternMatcher::new(&["mods/*.jar"]);
    assert!(matcher.should_ignore("mods\\a.jar", false));
}

#[test]
fn test_malformed_pattern_is_dropped_with_warning() {
    let warnings = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    let sink = warnings.clone();
    let log = RunLog::new(Some(std::sync::Arc::new(
        move |_: packsync::logging::LogLevel, line: &str| sink.lock().unwrap().push(line.to_string()),
    )));

    let filter = TreeFilter::new(&strings(&["mods", "[oops"]), &[], &log);

    assert_eq!(filter.folders().len(), 1);
    assert!(filter.is_managed_file("mods/a.jar"));
    assert_eq!(warnings.lock().unwrap().len(), 1);
}

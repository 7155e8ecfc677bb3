//! Rule matcher: evaluates a file listing against the category catalog.
//!
//! Pure and synchronous. Each category is evaluated on its own; within a
//! category every rule is tried against every candidate file, so one file
//! can contribute to several rules.

use crate::models::{CategoryResult, FileRecord, FoundDetails, Status};
use crate::rules::{CategoryConfig, MatchRule, PathPattern};
use crate::settings::{Settings, TimeRange};
use chrono::{Local, TimeZone, Timelike};
use tracing::{debug, info, warn};

pub const MANUAL_CHECK_MESSAGE: &str = "Manual check required; no validation path defined.";
pub const ALL_FOUND_MESSAGE: &str = "All required file types found.";

/// Evaluates every category in the process-local time zone.
pub fn evaluate(
    files: &[FileRecord],
    base: &str,
    configs: &[CategoryConfig],
    settings: &Settings,
) -> Vec<CategoryResult> {
    evaluate_in(files, base, configs, settings, &Local)
}

/// Like [`evaluate`], with modification hours read in `tz`.
pub fn evaluate_in<Tz: TimeZone>(
    files: &[FileRecord],
    base: &str,
    configs: &[CategoryConfig],
    settings: &Settings,
    tz: &Tz,
) -> Vec<CategoryResult> {
    info!(base, files = files.len(), categories = configs.len(), "starting validation");
    let results: Vec<CategoryResult> = configs
        .iter()
        .map(|config| evaluate_category(files, base, config, settings, tz))
        .collect();
    info!(
        passing = results.iter().filter(|r| r.status == Status::Passing).count(),
        failing = results.iter().filter(|r| r.status == Status::Failing).count(),
        "validation complete"
    );
    results
}

fn evaluate_category<Tz: TimeZone>(
    files: &[FileRecord],
    base: &str,
    config: &CategoryConfig,
    settings: &Settings,
    tz: &Tz,
) -> CategoryResult {
    if config.rules.is_empty() {
        debug!(category = %config.id, "no rules defined; manual check");
        return CategoryResult::pending(&config.id, MANUAL_CHECK_MESSAGE);
    }

    let compiled: Vec<(&MatchRule, PathPattern)> = config
        .rules
        .iter()
        .filter_map(|rule| match PathPattern::compile(base, &rule.path_pattern) {
            Ok(pattern) => Some((rule, pattern)),
            Err(e) => {
                warn!(category = %config.id, pattern = %rule.path_pattern, error = %e, "skipping uncompilable rule");
                None
            }
        })
        .collect();
    let window = if settings.time_check_enabled {
        settings.time_ranges.get(&config.id).copied()
    } else {
        None
    };

    // An unlabelled match still records its extension, with no labels.
    let mut found = FoundDetails::new();
    for file in files.iter().filter(|f| f.is_within(base)) {
        let Some(ext) = file.extension() else {
            continue;
        };
        if !config.requires(&ext) {
            continue;
        }
        for (rule, pattern) in &compiled {
            if rule_accepts(rule, pattern, file, window, tz) {
                debug!(category = %config.id, file = %file.path, pattern = pattern.as_str(), "rule matched");
                let labels = found.entry(ext.clone()).or_default();
                if let Some(label) = &rule.category {
                    if !labels.contains(label) {
                        labels.push(label.clone());
                    }
                }
            }
        }
    }

    let missing: Vec<&str> = config
        .required
        .iter()
        .filter(|ext| !found.contains_key(ext.as_str()))
        .map(String::as_str)
        .collect();
    let (status, message) = if missing.is_empty() {
        (Status::Passing, ALL_FOUND_MESSAGE.to_string())
    } else {
        (Status::Failing, format!("Missing types: {}", missing.join(", ")))
    };
    debug!(category = %config.id, %status, %message, "category evaluated");

    CategoryResult {
        id: config.id.clone(),
        status,
        message,
        found_details: found,
    }
}

fn rule_accepts<Tz: TimeZone>(
    rule: &MatchRule,
    pattern: &PathPattern,
    file: &FileRecord,
    window: Option<TimeRange>,
    tz: &Tz,
) -> bool {
    if !pattern.is_match(file.dir()) {
        return false;
    }
    if !rule.accepts_name(file.file_name()) {
        debug!(file = %file.path, keywords = ?rule.keywords, "keyword check failed");
        return false;
    }
    if let Some(window) = window {
        let hour = local_hour(file.mtime_ms, tz);
        if !hour.map(|h| window.contains(h)).unwrap_or(false) {
            debug!(
                file = %file.path,
                hour = ?hour,
                start = window.start(),
                end = window.end(),
                "time check failed"
            );
            return false;
        }
    }
    true
}

fn local_hour<Tz: TimeZone>(mtime_ms: i64, tz: &Tz) -> Option<u32> {
    tz.timestamp_millis_opt(mtime_ms)
        .earliest()
        .map(|dt| dt.hour())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    const BASE: &str = "2024 TRANSFER/05-01";

    fn at_hour(hour: u32) -> i64 {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 30, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn file(rel: &str, hour: u32) -> FileRecord {
        FileRecord::new(format!("{BASE}/{rel}"), at_hour(hour))
    }

    fn pics(id: &str) -> CategoryConfig {
        CategoryConfig {
            id: id.to_string(),
            kind: "Pics".to_string(),
            sub_kind: None,
            display_path: String::new(),
            required: vec!["jpg".to_string(), "cr2".to_string()],
            rules: vec![
                MatchRule::new("PHOTOS/EDITED").labelled("EDITED"),
                MatchRule::new("PHOTOS/RAW").labelled("RAW"),
            ],
        }
    }

    fn no_time_check() -> Settings {
        Settings {
            time_check_enabled: false,
            ..Settings::default()
        }
    }

    fn run(files: &[FileRecord], configs: &[CategoryConfig], settings: &Settings) -> Vec<CategoryResult> {
        evaluate_in(files, BASE, configs, settings, &Utc)
    }

    #[test]
    fn rule_less_categories_stay_pending() {
        let manual = CategoryConfig {
            rules: vec![],
            ..pics("manual")
        };
        for files in [vec![], vec![file("PHOTOS/EDITED/a.jpg", 10)]] {
            let results = run(&files, &[manual.clone()], &Settings::default());
            assert_eq!(results[0].status, Status::Pending);
            assert_eq!(results[0].message, MANUAL_CHECK_MESSAGE);
            assert!(results[0].found_details.is_empty());
        }
    }

    #[test]
    fn nothing_matching_lists_every_missing_extension() {
        let results = run(
            &[file("VIDEOS/clip.jpg", 10), file("PHOTOS/EDITED/notes.txt", 10)],
            &[pics("p")],
            &no_time_check(),
        );
        assert_eq!(results[0].status, Status::Failing);
        assert_eq!(results[0].message, "Missing types: jpg, cr2");
    }

    #[test]
    fn empty_listing_fails_every_ruled_category() {
        let results = run(&[], &[pics("a"), pics("b")], &no_time_check());
        assert!(results
            .iter()
            .all(|r| r.status == Status::Failing && r.message == "Missing types: jpg, cr2"));
    }

    #[test]
    fn partial_match_reports_only_missing_types() {
        let results = run(&[file("PHOTOS/EDITED/a.JPG", 10)], &[pics("p")], &no_time_check());
        assert_eq!(results[0].status, Status::Failing);
        assert_eq!(results[0].message, "Missing types: cr2");
        assert_eq!(results[0].found_details["jpg"], vec!["EDITED"]);
    }

    #[test]
    fn results_follow_config_order() {
        let configs = [pics("first"), pics("second"), pics("third")];
        let ids: Vec<String> = run(&[], &configs, &no_time_check())
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["first", "second", "third"]);
    }

    #[test]
    fn evaluation_is_idempotent() {
        let files = [file("PHOTOS/EDITED/a.jpg", 10), file("PHOTOS/RAW/a.cr2", 11)];
        let configs = [pics("p"), pics("q")];
        let settings = Settings::default();
        assert_eq!(run(&files, &configs, &settings), run(&files, &configs, &settings));
    }

    #[test]
    fn files_outside_the_base_prefix_are_ignored() {
        let files = [
            FileRecord::new("2024 TRANSFER/05-02/PHOTOS/EDITED/a.jpg", at_hour(10)),
            FileRecord::new("2024 TRANSFER/05-010/PHOTOS/RAW/a.cr2", at_hour(10)),
        ];
        let results = run(&files, &[pics("p")], &no_time_check());
        assert_eq!(results[0].message, "Missing types: jpg, cr2");
    }

    #[test]
    fn wildcard_rule_covers_sibling_subfolders() {
        let config = CategoryConfig {
            required: vec!["jpg".to_string()],
            rules: vec![MatchRule::new("PHOTOS/*").labelled("ANY")],
            ..pics("p")
        };
        for dir in ["PHOTOS/subdir", "PHOTOS/other"] {
            let results = run(&[file(&format!("{dir}/x.jpg"), 10)], &[config.clone()], &no_time_check());
            assert_eq!(results[0].status, Status::Passing, "{dir}");
        }
        let results = run(&[file("VIDEOS/subdir/x.jpg", 10)], &[config], &no_time_check());
        assert_eq!(results[0].status, Status::Failing);
    }

    #[test]
    fn keyword_filter_checks_the_file_name() {
        let config = CategoryConfig {
            required: vec!["cr2".to_string()],
            rules: vec![MatchRule::new("PHOTOS/*").with_keywords(&["raw"]).labelled("RAW")],
            ..pics("p")
        };
        let hit = run(&[file("PHOTOS/day/IMG_RAW.cr2", 10)], &[config.clone()], &no_time_check());
        assert_eq!(hit[0].status, Status::Passing);
        let miss = run(&[file("PHOTOS/day/IMG_FINAL.cr2", 10)], &[config], &no_time_check());
        assert_eq!(miss[0].status, Status::Failing);
    }

    #[test]
    fn time_window_applies_only_when_enabled() {
        let config = CategoryConfig {
            required: vec!["jpg".to_string()],
            rules: vec![MatchRule::new("PHOTOS/EDITED")],
            ..pics("airport-pics")
        };
        let mut settings = Settings::default();
        settings
            .time_ranges
            .insert("airport-pics".to_string(), TimeRange::new(9, 13).unwrap());

        let at_ten = [file("PHOTOS/EDITED/a.jpg", 10)];
        let at_two = [file("PHOTOS/EDITED/a.jpg", 14)];
        assert_eq!(run(&at_ten, &[config.clone()], &settings)[0].status, Status::Passing);
        assert_eq!(run(&at_two, &[config.clone()], &settings)[0].status, Status::Failing);

        settings.time_check_enabled = false;
        assert_eq!(run(&at_ten, &[config.clone()], &settings)[0].status, Status::Passing);
        assert_eq!(run(&at_two, &[config], &settings)[0].status, Status::Passing);
    }

    #[test]
    fn categories_without_a_window_ignore_the_time_check() {
        let settings = Settings::default();
        assert!(settings.time_check_enabled);
        let results = run(
            &[file("PHOTOS/EDITED/a.jpg", 2), file("PHOTOS/RAW/a.cr2", 23)],
            &[pics("no-window")],
            &settings,
        );
        assert_eq!(results[0].status, Status::Passing);
    }

    #[test]
    fn hours_are_read_in_the_given_zone() {
        let config = CategoryConfig {
            required: vec!["jpg".to_string()],
            rules: vec![MatchRule::new("PHOTOS/EDITED")],
            ..pics("airport-pics")
        };
        let settings = Settings::default();
        // 06:30 UTC is 10:30 at UTC+4.
        let files = [file("PHOTOS/EDITED/a.jpg", 6)];
        let plus_four = chrono::FixedOffset::east_opt(4 * 3600).unwrap();
        assert_eq!(
            evaluate_in(&files, BASE, &[config.clone()], &settings, &plus_four)[0].status,
            Status::Passing
        );
        assert_eq!(run(&files, &[config], &settings)[0].status, Status::Failing);
    }

    #[test]
    fn one_file_can_satisfy_several_rules() {
        let config = CategoryConfig {
            required: vec!["jpg".to_string()],
            rules: vec![
                MatchRule::new("PHOTOS/*").labelled("ANY"),
                MatchRule::new("PHOTOS/EDITED").labelled("EDITED"),
            ],
            ..pics("p")
        };
        let results = run(&[file("PHOTOS/EDITED/a.jpg", 10)], &[config], &no_time_check());
        assert_eq!(results[0].found_details["jpg"], vec!["ANY", "EDITED"]);
    }

    #[test]
    fn labels_are_recorded_once() {
        let files = [
            file("PHOTOS/EDITED/a.jpg", 10),
            file("PHOTOS/EDITED/b.jpg", 10),
            file("PHOTOS/EDITED/c.jpg", 10),
        ];
        let results = run(&files, &[pics("p")], &no_time_check());
        assert_eq!(results[0].found_details["jpg"], vec!["EDITED"]);
    }

    #[test]
    fn unlabelled_matches_still_count_as_found() {
        let config = CategoryConfig {
            required: vec!["jpg".to_string()],
            rules: vec![MatchRule::new("PHOTOS/*")],
            ..pics("p")
        };
        let results = run(&[file("PHOTOS/x/a.jpg", 10)], &[config], &no_time_check());
        assert_eq!(results[0].status, Status::Passing);
        assert_eq!(results[0].found_details["jpg"], Vec::<String>::new());
    }

    #[test]
    fn end_to_end_photo_category_passes() {
        let files = [
            FileRecord::new("2024 TRANSFER/05-01/PHOTOS/EDITED/a.jpg", at_hour(10)),
            FileRecord::new("2024 TRANSFER/05-01/PHOTOS/RAW/a.cr2", at_hour(10)),
        ];
        let results = run(&files, &[pics("p")], &no_time_check());
        assert_eq!(results[0].status, Status::Passing);
        assert_eq!(results[0].message, ALL_FOUND_MESSAGE);
        let expected: FoundDetails = [
            ("jpg".to_string(), vec!["EDITED".to_string()]),
            ("cr2".to_string(), vec!["RAW".to_string()]),
        ]
        .into_iter()
        .collect();
        assert_eq!(results[0].found_details, expected);
    }
}

//! Built-in category catalog, checked below each `<year>/<date>` folder.

use crate::rules::{CategoryConfig, MatchRule};

/// Sub-folders every photo category is split into.
pub const PHOTO_LABELS: [&str; 3] = ["EDITED", "JPEG", "RAW"];

fn photo_category(id: &str, kind: &str, folder: &str) -> CategoryConfig {
    CategoryConfig {
        id: id.to_string(),
        kind: kind.to_string(),
        sub_kind: Some("(Pics)".to_string()),
        display_path: format!("PHOTOS/{folder}/*"),
        required: vec!["jpg".to_string(), "cr2".to_string()],
        rules: PHOTO_LABELS
            .iter()
            .map(|label| MatchRule::new(&format!("PHOTOS/{folder}/{label}*")).labelled(label))
            .collect(),
    }
}

pub fn builtin() -> Vec<CategoryConfig> {
    vec![
        photo_category("arriving-sign-pics", "Arriving Sign", "ARRIVING SIGN"),
        photo_category("airport-pics", "Airport", "AIRPORT"),
        photo_category(
            "titlow-park-ruston-pics",
            "Titlow Park / Ruston",
            "TITLOW PARK - RUSTON",
        ),
        CategoryConfig {
            id: "missionary-requests-pics".to_string(),
            kind: "Missionary Requests".to_string(),
            sub_kind: Some("(Pics)".to_string()),
            display_path: "PHOTOS/MISSIONARY REQUESTS*".to_string(),
            required: vec!["jpg".to_string()],
            rules: vec![MatchRule::new("PHOTOS/MISSIONARY REQUESTS*")],
        },
        CategoryConfig {
            id: "airport-video".to_string(),
            kind: "Airport".to_string(),
            sub_kind: Some("(Video)".to_string()),
            display_path: "VIDEOS/AIRPORT*".to_string(),
            required: vec!["mp4".to_string()],
            rules: vec![MatchRule::new("VIDEOS/AIRPORT*")],
        },
        CategoryConfig {
            id: "welcome-letter".to_string(),
            kind: "Welcome Letter".to_string(),
            sub_kind: None,
            display_path: "DOCUMENTS/*welcome*".to_string(),
            required: vec!["pdf".to_string()],
            rules: vec![MatchRule::new("DOCUMENTS*").with_keywords(&["welcome", "letter"])],
        },
        CategoryConfig {
            id: "social-media-post".to_string(),
            kind: "Social Media Post".to_string(),
            sub_kind: None,
            display_path: "(manual)".to_string(),
            required: vec!["jpg".to_string()],
            rules: vec![],
        },
    ]
}

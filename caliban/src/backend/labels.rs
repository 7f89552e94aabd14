use std::collections::HashMap;

/// Centralizes label/key sanitization as a pure function so every backend applies the same
/// rule instead of ad-hoc string munging at each call site.
///
/// Replaces `.` with `_` and strips any byte outside `[a-z0-9_-]`, matching the alphabet most
/// label-bearing backends accept. A user-supplied label that collides with an auto-derived key
/// after sanitization wins over the auto-derived value.
pub fn sanitize_key_or_value(raw: &str) -> String {
    raw.chars()
        .map(|c| if c == '.' { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Merges auto-derived labels with user-supplied labels, sanitizing both, with user values
/// winning on key collision (post-sanitization).
pub fn sanitize_and_merge(
    auto: &HashMap<String, String>,
    user: &HashMap<String, String>,
) -> HashMap<String, String> {
    let mut merged: HashMap<String, String> = auto
        .iter()
        .map(|(k, v)| (sanitize_key_or_value(k), sanitize_key_or_value(v)))
        .collect();
    for (k, v) in user {
        merged.insert(sanitize_key_or_value(k), sanitize_key_or_value(v));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_become_underscores() {
        assert_eq!(sanitize_key_or_value("caliban.dev.example"), "caliban_dev_example");
    }

    #[test]
    fn forbidden_characters_stripped() {
        assert_eq!(sanitize_key_or_value("user@host!"), "userhost");
    }

    #[test]
    fn user_label_wins_on_collision() {
        let mut auto = HashMap::new();
        auto.insert("owner".to_string(), "auto-value".to_string());
        let mut user = HashMap::new();
        user.insert("owner".to_string(), "user-value".to_string());
        let merged = sanitize_and_merge(&auto, &user);
        assert_eq!(merged.get("owner").unwrap(), "user-value");
    }

    #[test]
    fn collision_after_sanitization_still_resolves_to_user_value() {
        let mut auto = HashMap::new();
        auto.insert("owner.id".to_string(), "auto".to_string());
        let mut user = HashMap::new();
        user.insert("owner_id".to_string(), "user".to_string());
        let merged = sanitize_and_merge(&auto, &user);
        assert_eq!(merged.get("owner_id").unwrap(), "user");
    }
}

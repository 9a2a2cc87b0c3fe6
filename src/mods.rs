//! Mod normalizer (component C): extracts and canonicalizes the mod-acronym
//! set embedded in a score row's `data` JSON payload.

use serde_json::Value as Json;

/// `(mods_key, speed_mod)`.
pub type NormalizedMods = (String, Option<String>);

/// Parse the raw `data` column value (expected to hold a JSON object with a
/// `mods` array of `{"acronym": ...}` records) into a canonical mods key and
/// derived speed-mod tag. Null or JSON-invalid input yields `("", None)`
/// rather than erroring; the caller is responsible for counting this as a
/// `JsonIgnored` diagnostic when `raw` was non-null.
pub fn normalize(raw: Option<&str>) -> NormalizedMods {
    let Some(raw) = raw else {
        return (String::new(), None);
    };

    let acronyms = match serde_json::from_str::<Json>(raw) {
        Ok(json) => extract_acronyms(&json),
        Err(_) => return (String::new(), None),
    };

    canonicalize(acronyms)
}

/// True when the payload parsed as JSON but had no usable `mods` field,
/// distinguishing "valid JSON, nothing to extract" from "not JSON at all"
/// for diagnostics purposes.
pub fn is_json_ignored(raw: Option<&str>) -> bool {
    match raw {
        None => false,
        Some(raw) => serde_json::from_str::<Json>(raw).is_err(),
    }
}

fn extract_acronyms(json: &Json) -> Vec<String> {
    let Some(mods) = json.get("mods").and_then(Json::as_array) else {
        return Vec::new();
    };
    mods.iter()
        .filter_map(|m| m.get("acronym").and_then(Json::as_str))
        .map(str::to_string)
        .collect()
}

fn canonicalize(mut acronyms: Vec<String>) -> NormalizedMods {
    acronyms.sort();
    acronyms.dedup();

    let speed_mod = if acronyms.iter().any(|a| a == "DT" || a == "NC") {
        Some("DT".to_string())
    } else if acronyms.iter().any(|a| a == "HT") {
        Some("HT".to_string())
    } else {
        None
    };

    (acronyms.join(","), speed_mod)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_data_yields_empty() {
        assert_eq!(normalize(None), (String::new(), None));
    }

    #[test]
    fn invalid_json_yields_empty() {
        assert_eq!(normalize(Some("not json")), (String::new(), None));
    }

    #[test]
    fn missing_mods_field_yields_empty() {
        assert_eq!(normalize(Some("{}")), (String::new(), None));
    }

    #[test]
    fn sorted_join_and_dt_precedence() {
        let (key, speed) = normalize(Some(r#"{"mods":[{"acronym":"HR"},{"acronym":"DT"}]}"#));
        assert_eq!(key, "DT,HR");
        assert_eq!(speed, Some("DT".to_string()));
    }

    #[test]
    fn dt_wins_over_ht_on_cooccurrence() {
        let (key, speed) = normalize(Some(r#"{"mods":[{"acronym":"HT"},{"acronym":"NC"}]}"#));
        assert_eq!(key, "HT,NC");
        assert_eq!(speed, Some("DT".to_string()));
    }

    #[test]
    fn ht_alone() {
        let (_, speed) = normalize(Some(r#"{"mods":[{"acronym":"HT"}]}"#));
        assert_eq!(speed, Some("HT".to_string()));
    }

    #[test]
    fn no_speed_mod() {
        let (key, speed) = normalize(Some(r#"{"mods":[{"acronym":"HD"}]}"#));
        assert_eq!(key, "HD");
        assert_eq!(speed, None);
    }

    #[test]
    fn duplicate_acronyms_collapse() {
        let (key, _) = normalize(Some(r#"{"mods":[{"acronym":"HD"},{"acronym":"HD"}]}"#));
        assert_eq!(key, "HD");
    }

    #[test]
    fn idempotent_on_already_canonical_input() {
        let first = normalize(Some(r#"{"mods":[{"acronym":"HR"},{"acronym":"DT"}]}"#));
        let rebuilt = format!(
            r#"{{"mods":[{}]}}"#,
            first
                .0
                .split(',')
                .map(|a| format!(r#"{{"acronym":"{a}"}}"#))
                .collect::<Vec<_>>()
                .join(",")
        );
        let second = normalize(Some(&rebuilt));
        assert_eq!(first, second);
    }
}

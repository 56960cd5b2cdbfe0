//! Field-level helpers shared by site block parsers.

use std::sync::LazyLock;

use chrono::Month;
use regex::Regex;

use super::blocks::DataBlock;
use crate::record::{EmploymentStatus, Location};

/// Column delimiter of the output file; never allowed inside a field.
pub const FIELD_DELIMITER: char = '|';

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static STARS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s+out of\s+5").unwrap());
static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s+to\s+(\d+)").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());

/// Tried in order, first match wins. Each covers one way the site writes a
/// location.
static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // "Hobart TAS 7000"
        r"^(?P<city>.+?)\s+(?P<state>[A-Z]{2,3})\s+(?P<postcode>\d{4})$",
        // "All Brisbane QLD"
        r"^All\s+(?P<city>.+?)\s+(?P<state>[A-Z]{2,3})$",
        // "Sydney NSW"
        r"^(?P<city>.+?)\s+(?P<state>[A-Z]{2,3})$",
        // "Queanbeyan, New South Wales, Australia"
        r"^(?P<city>[^,]+),\s*(?P<state>[^,]+),\s*(?P<country>[^,]+)$",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Collapse whitespace, trim, and strip characters that would break the
/// output file.
pub fn clean_text(s: &str) -> String {
    WS_RE
        .replace_all(s.trim(), " ")
        .replace('"', "'")
        .replace(FIELD_DELIMITER, ",")
}

pub fn parse_tenure(s: &str) -> String {
    let lower = s.to_lowercase();
    if lower.contains("less than 1") {
        "<1".to_string()
    } else if lower.contains("more than 12") {
        ">12".to_string()
    } else if let Some(caps) = RANGE_RE.captures(&lower) {
        format!("{}-{}", &caps[1], &caps[2])
    } else {
        String::new()
    }
}

pub fn parse_employment_status(s: &str) -> EmploymentStatus {
    let lower = s.to_lowercase();
    if lower.contains("former") {
        EmploymentStatus::Former
    } else if lower.contains("current") {
        EmploymentStatus::Current
    } else {
        EmploymentStatus::Unknown
    }
}

/// Split a location into (city, state, postcode). Unmatched input comes back
/// as the city with empty state and postcode.
pub fn decompose_location(s: &str) -> (String, String, String) {
    let s = s.trim();
    for re in LOCATION_PATTERNS.iter() {
        if let Some(caps) = re.captures(s) {
            let get = |name: &str| {
                caps.name(name)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default()
            };
            return (get("city"), get("state"), get("postcode"));
        }
    }
    (s.to_string(), String::new(), String::new())
}

pub fn parse_location(raw: &str) -> Location {
    let raw = clean_text(raw);
    let (city, state, postcode) = decompose_location(&raw);
    Location {
        raw,
        city,
        state,
        postcode,
    }
}

/// "4 out of 5" → 4.0
pub fn parse_stars(s: &str) -> Option<f32> {
    STARS_RE.captures(s)?[1].parse().ok()
}

/// Rating read from the fragment right after `label`. Label-relative so that
/// categories may reorder or go missing.
pub fn rating_after_label(block: &DataBlock, label: &str) -> Option<f32> {
    let pos = block.position_of(label)?;
    parse_stars(block.get(pos + 1)?)
}

/// "March 2023" → (2023, 3)
pub fn parse_month_year(s: &str) -> Option<(i32, u32)> {
    let mut parts = s.split_whitespace();
    let month: Month = parts.next()?.parse().ok()?;
    let year = parts.next()?;
    if !YEAR_RE.is_match(year) || parts.next().is_some() {
        return None;
    }
    Some((year.parse().ok()?, month.number_from_month()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::blocks::IndexWindow;

    #[test]
    fn tenure_table() {
        assert_eq!(parse_tenure("Less than 1 year"), "<1");
        assert_eq!(parse_tenure("More than 12 years"), ">12");
        assert_eq!(parse_tenure("3 to 5 years"), "3-5");
        assert_eq!(parse_tenure("Unspecified"), "");
        assert_eq!(parse_tenure("1 to 2 years in the role, current employee"), "1-2");
    }

    #[test]
    fn location_table() {
        let t = |a: &str, b: &str, c: &str| (a.to_string(), b.to_string(), c.to_string());
        assert_eq!(decompose_location("Hobart TAS 7000"), t("Hobart", "TAS", "7000"));
        assert_eq!(decompose_location("All Brisbane QLD"), t("Brisbane", "QLD", ""));
        assert_eq!(
            decompose_location("Queanbeyan, New South Wales, Australia"),
            t("Queanbeyan", "New South Wales", "")
        );
        assert_eq!(decompose_location("Sydney NSW"), t("Sydney", "NSW", ""));
        assert_eq!(decompose_location("Remote"), t("Remote", "", ""));
    }

    #[test]
    fn location_keeps_raw() {
        let loc = parse_location("  Surry   Hills NSW 2010 ");
        assert_eq!(loc.raw, "Surry Hills NSW 2010");
        assert_eq!(loc.city, "Surry Hills");
        assert_eq!(loc.postcode, "2010");
    }

    #[test]
    fn status() {
        assert_eq!(parse_employment_status("2 years, Former employee"), EmploymentStatus::Former);
        assert_eq!(parse_employment_status("CURRENT employee"), EmploymentStatus::Current);
        assert_eq!(parse_employment_status("3 to 5 years"), EmploymentStatus::Unknown);
    }

    #[test]
    fn cleaning() {
        assert_eq!(clean_text("  a \n\t b  "), "a b");
        assert_eq!(clean_text(r#"the "best" | worst"#), "the 'best' , worst");
    }

    #[test]
    fn stars_and_labels() {
        assert_eq!(parse_stars("4 out of 5"), Some(4.0));
        assert_eq!(parse_stars("3.5 out of 5 stars"), Some(3.5));
        assert_eq!(parse_stars("Management"), None);

        let block = DataBlock {
            window: IndexWindow { start: 0, end: 4 },
            fields: vec!["Management".into(), "2 out of 5".into(), "Benefits & perks".into(), "oops".into()],
        };
        assert_eq!(rating_after_label(&block, "Management"), Some(2.0));
        assert_eq!(rating_after_label(&block, "Benefits & perks"), None);
        assert_eq!(rating_after_label(&block, "Work/Life balance"), None);
    }

    #[test]
    fn month_year() {
        assert_eq!(parse_month_year("March 2023"), Some((2023, 3)));
        assert_eq!(parse_month_year("Dec 2019"), Some((2019, 12)));
        assert_eq!(parse_month_year("Smarch 2023"), None);
        assert_eq!(parse_month_year("March 23"), None);
        assert_eq!(parse_month_year("March"), None);
    }
}

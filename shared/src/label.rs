/// Subject, topic and title inference from free-form entry names.
///
/// Uploaded lists follow a handful of loose naming conventions, e.g.
/// `(Physics by XYZ Sir) Lecture 4 || Kinematics` or `Chemistry - Mole Concept L2`.
use once_cell::sync::Lazy;
use regex::Regex;

/// Subject used when no naming convention matches.
pub const FALLBACK_SUBJECT: &str = "Miscellaneous";

/// Topic used for videos whose name has no `" - "` separator.
pub const FALLBACK_TOPIC: &str = "General Videos";

/// `(Subject) rest of the title`
static PAREN_SUBJECT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\((.*?)\)").unwrap());

/// `Subject by Sir || Title` / `Subject By Mam || Title`
static LECTURER_SUBJECT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*? (?:by|By) (?:Sir|Mam))\s*\|\|\s*(.*)").unwrap()
});

/// Split an entry name into `(subject, title)`. First matching convention wins.
pub fn parse_label(name: &str) -> (String, String) {
    let name = name.trim();
    let (subject, title) = match_conventions(name);
    let subject = if subject.is_empty() {
        FALLBACK_SUBJECT.to_string()
    } else {
        subject
    };
    let title = if title.is_empty() { name.to_string() } else { title };
    (subject, title)
}

fn match_conventions(name: &str) -> (String, String) {
    if let Some(cap) = PAREN_SUBJECT_RE.captures(name) {
        let subject = cap[1].trim().to_string();
        let rest = &name[cap[0].len()..];
        let title = rest
            .trim()
            .trim_start_matches(|c: char| c == '|' || c == ' ')
            .trim()
            .to_string();
        return (subject, title);
    }

    if let Some(cap) = LECTURER_SUBJECT_RE.captures(name) {
        return (cap[1].trim().to_string(), cap[2].trim().to_string());
    }

    if let Some((subject, title)) = name.split_once("||") {
        return (subject.trim().to_string(), title.trim().to_string());
    }

    (FALLBACK_SUBJECT.to_string(), name.to_string())
}

/// Split a video name into `(topic, title)` on the first `" - "`.
pub fn split_topic(name: &str) -> (String, String) {
    match name.split_once(" - ") {
        Some((topic, title)) if !topic.trim().is_empty() => {
            let title = title.trim();
            let title = if title.is_empty() { name.trim() } else { title };
            (topic.trim().to_string(), title.to_string())
        }
        _ => (FALLBACK_TOPIC.to_string(), name.trim().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(s: &str, t: &str) -> (String, String) {
        (s.to_string(), t.to_string())
    }

    #[test]
    fn test_parenthesised_subject() {
        assert_eq!(
            parse_label("(Physics by Alok Sir) Lecture 04 || Kinematics"),
            pair("Physics by Alok Sir", "Lecture 04 || Kinematics")
        );
    }

    #[test]
    fn test_parenthesised_subject_strips_leading_bars() {
        assert_eq!(
            parse_label("(Maths) || Class 1 Sets"),
            pair("Maths", "Class 1 Sets")
        );
    }

    #[test]
    fn test_lecturer_subject() {
        assert_eq!(
            parse_label("Organic Chemistry by Pankaj Sir || Class 12 GOC"),
            pair("Organic Chemistry by Pankaj Sir", "Class 12 GOC")
        );
        assert_eq!(
            parse_label("Biology By Mam||Cell Cycle"),
            pair("Biology By Mam", "Cell Cycle")
        );
    }

    #[test]
    fn test_double_bar_fallback() {
        assert_eq!(
            parse_label("Lecture 12 || Thermodynamics || Part 2"),
            pair("Lecture 12", "Thermodynamics || Part 2")
        );
    }

    #[test]
    fn test_miscellaneous_fallback() {
        assert_eq!(parse_label("Intro video"), pair(FALLBACK_SUBJECT, "Intro video"));
    }

    #[test]
    fn test_empty_parts_fall_back() {
        assert_eq!(parse_label("() Orientation"), pair(FALLBACK_SUBJECT, "Orientation"));
        assert_eq!(parse_label("(History)"), pair("History", "(History)"));
    }

    #[test]
    fn test_split_topic() {
        assert_eq!(
            split_topic("Polity - Fundamental Rights L3"),
            pair("Polity", "Fundamental Rights L3")
        );
        assert_eq!(split_topic("Lecture 1"), pair(FALLBACK_TOPIC, "Lecture 1"));
        assert_eq!(split_topic("A - B - C"), pair("A", "B - C"));
    }
}

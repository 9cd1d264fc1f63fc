//! Keyword heuristic used as a reference point for model estimates.

const LOW_COMPLEXITY: &[&str] = &["view", "read", "list", "display", "browse"];
const MEDIUM_COMPLEXITY: &[&str] = &["update", "create", "form", "auth", "discount", "assign"];
const HIGH_COMPLEXITY: &[&str] = &[
    "integrate",
    "export",
    "import",
    "payment",
    "real time",
    "dashboard",
    "analytics",
    "notifications",
];

/// Estimate story points from complexity keywords in the story text
pub fn heuristic_estimate(story: &str) -> u32 {
    let story_lower = story.to_lowercase();
    let count = |indicators: &[&str]| {
        indicators
            .iter()
            .filter(|indicator| story_lower.contains(*indicator))
            .count() as u32
    };

    let high = count(HIGH_COMPLEXITY);
    let medium = count(MEDIUM_COMPLEXITY);
    let low = count(LOW_COMPLEXITY);

    if high > 0 {
        (6 + high).min(10)
    } else if medium > 0 {
        (3 + medium).min(8)
    } else if low > 0 {
        (1 + low).min(5)
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_high_complexity() {
        assert_eq!(heuristic_estimate("Integrate a payment provider"), 8);
        assert_eq!(
            heuristic_estimate("Export analytics from the dashboard with real time notifications and import"),
            10
        );
    }

    #[test]
    fn test_high_complexity_wins_over_lower_tiers() {
        assert_eq!(heuristic_estimate("View and export the order list"), 7);
    }

    #[test]
    fn test_medium_complexity() {
        assert_eq!(heuristic_estimate("Create a signup form"), 5);
        assert_eq!(heuristic_estimate("As a manager I want to assign tasks"), 4);
    }

    #[test]
    fn test_low_complexity() {
        assert_eq!(heuristic_estimate("As a user I want to VIEW my profile"), 2);
        assert_eq!(heuristic_estimate("Browse and list products"), 3);
    }

    #[test]
    fn test_unrecognized_story() {
        assert_eq!(heuristic_estimate("Something entirely different"), 3);
        assert_eq!(heuristic_estimate(""), 3);
    }
}

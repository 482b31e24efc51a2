//! Built-in nutrition reconciliation table.
//!
//! The model guesses a food name; we reconcile it against this table to
//! attach approximate per-serving facts. Matching is normalized lowercase
//! trim, exact key first, then substring containment in either direction,
//! first match wins. A miss is not an error - the item is logged without
//! facts.

use vigil_protocol::Nutrition;

const fn facts(calories: f64, protein_g: f64, carbs_g: f64, fat_g: f64) -> Nutrition {
    Nutrition {
        calories,
        protein_g,
        carbs_g,
        fat_g,
    }
}

/// Approximate per-serving values.
const NUTRITION_TABLE: &[(&str, Nutrition)] = &[
    ("cooked rice", facts(205.0, 4.3, 44.5, 0.4)),
    ("scrambled eggs", facts(180.0, 12.0, 2.0, 13.0)),
    ("fried egg", facts(90.0, 6.3, 0.4, 7.0)),
    ("white bread", facts(75.0, 2.6, 14.0, 1.0)),
    ("whole wheat bread", facts(80.0, 4.0, 14.0, 1.1)),
    ("chicken breast", facts(165.0, 31.0, 0.0, 3.6)),
    ("grilled chicken", facts(165.0, 31.0, 0.0, 3.6)),
    ("beef steak", facts(271.0, 25.0, 0.0, 19.0)),
    ("mashed potatoes", facts(210.0, 4.0, 35.0, 7.0)),
    ("french fries", facts(312.0, 3.4, 41.0, 15.0)),
    ("green salad", facts(33.0, 1.5, 6.5, 0.2)),
    ("tomato", facts(22.0, 1.1, 4.8, 0.2)),
    ("avocado", facts(240.0, 3.0, 12.8, 22.0)),
    ("banana", facts(105.0, 1.3, 27.0, 0.4)),
    ("apple", facts(95.0, 0.5, 25.0, 0.3)),
    ("orange juice", facts(110.0, 1.7, 26.0, 0.5)),
    ("milk", facts(122.0, 8.1, 11.7, 4.8)),
    ("yogurt", facts(150.0, 8.5, 11.4, 8.0)),
    ("cheese", facts(113.0, 7.0, 0.9, 9.0)),
    ("spaghetti with sauce", facts(220.0, 8.0, 43.0, 1.3)),
    ("lentil soup", facts(180.0, 12.0, 30.0, 0.8)),
    ("salmon", facts(208.0, 20.0, 0.0, 13.0)),
    ("black coffee", facts(2.0, 0.3, 0.0, 0.0)),
    ("oatmeal", facts(158.0, 6.0, 27.0, 3.2)),
];

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Look up nutrition facts for a model-reported food name.
pub fn lookup_nutrition(name: &str) -> Option<Nutrition> {
    let wanted = normalize(name);
    if wanted.is_empty() {
        return None;
    }

    // Exact match first
    if let Some((_, n)) = NUTRITION_TABLE.iter().find(|(key, _)| *key == wanted) {
        return Some(*n);
    }

    // Then partial: the guess contained in a key, or a key in the guess.
    NUTRITION_TABLE
        .iter()
        .find(|(key, _)| key.contains(&wanted) || wanted.contains(key))
        .map(|(_, n)| *n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        let n = lookup_nutrition("cooked rice").unwrap();
        assert_eq!(n.calories, 205.0);
    }

    #[test]
    fn test_normalized_match() {
        assert!(lookup_nutrition("  Cooked Rice ").is_some());
    }

    #[test]
    fn test_guess_contained_in_key() {
        // "rice" is a substring of "cooked rice"
        let n = lookup_nutrition("rice").unwrap();
        assert_eq!(n.calories, 205.0);
    }

    #[test]
    fn test_key_contained_in_guess() {
        // "white bread" is a substring of the fuller guess
        let n = lookup_nutrition("toasted white bread slice").unwrap();
        assert_eq!(n.calories, 75.0);
    }

    #[test]
    fn test_first_match_wins() {
        // "egg" matches both egg entries; the earlier row is returned.
        let n = lookup_nutrition("egg").unwrap();
        assert_eq!(n.protein_g, 12.0);
    }

    #[test]
    fn test_miss_returns_none() {
        assert!(lookup_nutrition("dragonfruit smoothie").is_none());
        assert!(lookup_nutrition("").is_none());
    }
}

//! Keyword rules that turn free text into a category.

use crate::error::Res;
use crate::model::Category;
use anyhow::Context;
use regex::{Regex, RegexBuilder};

/// Built-in rules, evaluated top to bottom. The first rule whose pattern matches wins, so the order
/// here is the tie-break when a text mentions several kinds of place.
fn builtin_rules() -> [(&'static str, Category); 9] {
    [
        (r"supermarket|grocery|grocer|market", Category::Groceries),
        (
            r"cafe|coffee|restaurant|bar|pub|pizza|burger|kitchen|bakery",
            Category::FoodAndDrink,
        ),
        (
            r"uber|lyft|taxi|ride ?hail|cab|metro|subway|train|bus|transit|fuel|gas station",
            Category::Transport,
        ),
        (
            r"pharmacy|drugstore|clinic|dental|optical|health|wellness",
            Category::Health,
        ),
        (
            r"hotel|airlines?|flight|airways|hostel|bnb|booking|travel|tour|resort",
            Category::Travel,
        ),
        (
            r"cinema|theater|theatre|movie|concert|museum|park|stadium|ticket",
            Category::Entertainment,
        ),
        (
            r"utility|electric|water|gas bill|internet|broadband|mobile|cellular|phone",
            Category::BillsAndUtilities,
        ),
        (
            r"college|university|tuition|course|class|learning|education|school",
            Category::Education,
        ),
        (
            r"amazon|target|walmart|costco|mall|boutique|store|retail|shop|outlet",
            Category::Shopping,
        ),
    ]
}

/// A case-insensitive, whole-word pattern paired with the category it implies.
#[derive(Debug, Clone)]
pub struct KeywordRule {
    pattern: Regex,
    category: Category,
}

impl KeywordRule {
    /// Builds a rule from a regex alternation. The alternation is wrapped in word boundaries and
    /// matched case-insensitively.
    pub fn new(alternation: &str, category: Category) -> Res<Self> {
        let pattern = RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
            .case_insensitive(true)
            .build()
            .with_context(|| format!("Invalid keyword pattern for {category}: {alternation}"))?;
        Ok(Self { pattern, category })
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// An ordered list of `KeywordRule`s. Pure and deterministic: the same text always yields the same
/// category.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<KeywordRule>,
}

impl KeywordClassifier {
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        Self { rules }
    }

    /// The built-in merchant rules.
    pub fn builtin() -> Res<Self> {
        let rules = builtin_rules()
            .into_iter()
            .map(|(pattern, category)| KeywordRule::new(pattern, category))
            .collect::<Res<Vec<_>>>()?;
        Ok(Self::new(rules))
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    /// Returns the category of the first matching rule, or `None`.
    pub fn classify(&self, text: &str) -> Option<Category> {
        self.rules
            .iter()
            .find(|rule| rule.is_match(text))
            .map(|rule| rule.category.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> KeywordClassifier {
        KeywordClassifier::builtin().unwrap()
    }

    #[test]
    fn test_builtin_order() {
        let c = classifier();
        let categories: Vec<&Category> = c.rules().iter().map(KeywordRule::category).collect();
        assert_eq!(categories.first(), Some(&&Category::Groceries));
        assert_eq!(categories.last(), Some(&&Category::Shopping));
        assert_eq!(categories.len(), 9);
    }

    #[test]
    fn test_classify_simple() {
        let c = classifier();
        assert_eq!(
            c.classify("Blue Bottle Coffee, Oakland, amenity cafe"),
            Some(Category::FoodAndDrink)
        );
        assert_eq!(
            c.classify("Safeway, shop supermarket"),
            Some(Category::Groceries)
        );
        assert_eq!(c.classify("Delta Air Lines is an airline"), Some(Category::Travel));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classifier().classify("PHARMACY"), Some(Category::Health));
    }

    #[test]
    fn test_word_boundaries() {
        // "barn" is not "bar", "cabinet" is not "cab"
        assert_eq!(classifier().classify("barn cabinet"), None);
    }

    #[test]
    fn test_first_rule_wins() {
        // Food & Drink comes before Health in the rule order.
        let c = classifier();
        assert_eq!(
            c.classify("a pharmacy next to a restaurant"),
            Some(Category::FoodAndDrink)
        );
        // Transport's "gas station" comes before Bills & Utilities' "gas bill".
        assert_eq!(c.classify("gas station"), Some(Category::Transport));
        assert_eq!(c.classify("the monthly gas bill"), Some(Category::BillsAndUtilities));
    }

    #[test]
    fn test_deterministic() {
        let c = classifier();
        let text = "Walmart Supercenter, retail store";
        assert_eq!(c.classify(text), c.classify(text));
        assert_eq!(c.classify(text), Some(Category::Shopping));
    }

    #[test]
    fn test_no_match() {
        assert_eq!(classifier().classify("ZZQX 4411"), None);
        assert_eq!(classifier().classify(""), None);
    }

    #[test]
    fn test_custom_rules() {
        let c = KeywordClassifier::new(vec![
            KeywordRule::new("vet|kennel", Category::Custom("Pets".into())).unwrap(),
        ]);
        assert_eq!(
            c.classify("Happy Paws Kennel"),
            Some(Category::Custom("Pets".into()))
        );
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(KeywordRule::new("(unclosed", Category::Other).is_err());
    }
}

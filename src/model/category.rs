use anyhow::bail;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The label shown for transactions that have no category. It is never stored in the merchant map.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A spending category: one of the fixed, ordered set or whatever the user typed.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Category {
    FoodAndDrink,
    Groceries,
    Transport,
    Shopping,
    Travel,
    Entertainment,
    BillsAndUtilities,
    Health,
    Education,
    Income,
    Other,
    Custom(String),
}

impl Category {
    /// The fixed categories, in display order.
    pub const STANDARD: [Category; 11] = [
        Category::FoodAndDrink,
        Category::Groceries,
        Category::Transport,
        Category::Shopping,
        Category::Travel,
        Category::Entertainment,
        Category::BillsAndUtilities,
        Category::Health,
        Category::Education,
        Category::Income,
        Category::Other,
    ];

    pub fn label(&self) -> &str {
        match self {
            Category::FoodAndDrink => "Food & Drink",
            Category::Groceries => "Groceries",
            Category::Transport => "Transport",
            Category::Shopping => "Shopping",
            Category::Travel => "Travel",
            Category::Entertainment => "Entertainment",
            Category::BillsAndUtilities => "Bills & Utilities",
            Category::Health => "Health",
            Category::Education => "Education",
            Category::Income => "Income",
            Category::Other => "Other",
            Category::Custom(s) => s.as_str(),
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Category::Custom(_))
    }

    /// Position in `STANDARD`, if this is a fixed category.
    pub fn standard_index(&self) -> Option<usize> {
        Self::STANDARD.iter().position(|c| c == self)
    }

    /// Holds a category built in code to the same rules as typed input. A `Custom` label is
    /// trimmed, must not be blank or `Uncategorized`, and becomes the standard category it names.
    pub fn validated(&self) -> anyhow::Result<Category> {
        Category::from_str(self.label())
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    /// Standard labels match case-insensitively; anything else becomes `Custom`. Blank input and
    /// the `Uncategorized` sentinel are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            bail!("A category must not be blank");
        }
        if trimmed.eq_ignore_ascii_case(UNCATEGORIZED) {
            bail!("'{UNCATEGORIZED}' is reserved and cannot be used as a category");
        }
        let found = Self::STANDARD
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(trimmed));
        Ok(found.unwrap_or_else(|| Category::Custom(trimmed.to_string())))
    }
}

impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Category::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Display label for an optional category, falling back to `Uncategorized`.
pub fn label_or_uncategorized(category: Option<&Category>) -> &str {
    category.map(Category::label).unwrap_or(UNCATEGORIZED)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_labels_round_trip() {
        for c in Category::STANDARD {
            assert_eq!(Category::from_str(c.label()).unwrap(), c);
        }
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(
            Category::from_str("  food & drink ").unwrap(),
            Category::FoodAndDrink
        );
        assert_eq!(
            Category::from_str("BILLS & UTILITIES").unwrap(),
            Category::BillsAndUtilities
        );
    }

    #[test]
    fn test_free_text_is_custom() {
        let c = Category::from_str(" Pets ").unwrap();
        assert_eq!(c, Category::Custom("Pets".to_string()));
        assert!(c.is_custom());
        assert_eq!(c.to_string(), "Pets");
        assert_eq!(c.standard_index(), None);
    }

    #[test]
    fn test_blank_and_sentinel_rejected() {
        assert!(Category::from_str("   ").is_err());
        assert!(Category::from_str("uncategorized").is_err());
    }

    #[test]
    fn test_validated() {
        assert_eq!(
            Category::Custom(" Pets ".into()).validated().unwrap(),
            Category::Custom("Pets".into())
        );
        assert_eq!(
            Category::Custom("groceries".into()).validated().unwrap(),
            Category::Groceries
        );
        assert_eq!(Category::Travel.validated().unwrap(), Category::Travel);
        assert!(Category::Custom("Uncategorized".into()).validated().is_err());
        assert!(Category::Custom("  ".into()).validated().is_err());
    }

    #[test]
    fn test_label_or_uncategorized() {
        assert_eq!(label_or_uncategorized(None), "Uncategorized");
        assert_eq!(label_or_uncategorized(Some(&Category::Travel)), "Travel");
    }

    #[test]
    fn test_serde() {
        let json = serde_json::to_string(&Category::FoodAndDrink).unwrap();
        assert_eq!(json, "\"Food & Drink\"");
        let c: Category = serde_json::from_str("\"Gifts\"").unwrap();
        assert_eq!(c, Category::Custom("Gifts".into()));
    }
}

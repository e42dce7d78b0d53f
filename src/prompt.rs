//! Asking a human for a merchant's category.

use crate::error::{ErrorType, IntoResult};
use crate::model::Category;
use crate::Result;
use anyhow::Context;
use dialoguer::{Input, Select};
use std::str::FromStr;

const OTHER: &str = "Other (type your own)";
const SKIP: &str = "Skip";

/// Picks a category for a merchant. `None` means the merchant is skipped and stays unresolved.
pub trait Chooser {
    fn choose(
        &mut self,
        merchant: &str,
        suggestion: Option<&Category>,
    ) -> Result<Option<Category>>;
}

/// A `Chooser` that shows the standard categories in the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalChooser;

impl TerminalChooser {
    fn items() -> Vec<String> {
        Category::STANDARD
            .iter()
            .map(|c| c.label().to_string())
            .chain([OTHER.to_string(), SKIP.to_string()])
            .collect()
    }

    fn type_your_own(suggestion: Option<&Category>) -> Result<Category> {
        let mut input = Input::<String>::new()
            .with_prompt("Category")
            .validate_with(|s: &String| -> std::result::Result<(), String> {
                Category::from_str(s).map(|_| ()).map_err(|e| e.to_string())
            });
        if let Some(custom) = suggestion.filter(|c| c.is_custom()) {
            input = input.default(custom.label().to_string());
        }
        let typed = input
            .interact_text()
            .context("Unable to read the category")
            .pub_result(ErrorType::Service)?;
        Category::from_str(&typed).pub_result(ErrorType::Input)
    }
}

impl Chooser for TerminalChooser {
    fn choose(
        &mut self,
        merchant: &str,
        suggestion: Option<&Category>,
    ) -> Result<Option<Category>> {
        let items = Self::items();
        let other = Category::STANDARD.len();
        let default = match suggestion {
            Some(c) if c.is_custom() => other,
            Some(c) => c.standard_index().unwrap_or(0),
            None => 0,
        };
        let picked = Select::new()
            .with_prompt(format!("Category for '{merchant}'"))
            .items(&items)
            .default(default)
            .interact_opt()
            .context("Unable to read the selection")
            .pub_result(ErrorType::Service)?;

        match picked {
            Some(i) if i < other => Ok(Category::STANDARD.get(i).cloned()),
            Some(i) if i == other => Self::type_your_own(suggestion).map(Some),
            _ => Ok(None),
        }
    }
}

use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::memory::{MerchantMap, MerchantMemory, MerchantRecord};
use crate::model::Category;
use crate::{Config, Result};
use std::str::FromStr;
use tracing::debug;

/// Saves `category` for `merchant` in the merchant map, replacing any category already stored for
/// the same merchant.
///
/// # Errors
/// - `Input` if the category or merchant is blank, or the category is `Uncategorized`.
/// - `Storage` if the merchant map cannot be read or written.
pub async fn learn(
    config: &Config,
    merchant: &str,
    category: &str,
) -> Result<Out<MerchantRecord>> {
    let category = Category::from_str(category).pub_result(ErrorType::Input)?;
    let mut map = MerchantMap::from_config(config).await?;
    map.learn(merchant, &category).await?;
    let record = MerchantRecord::new(merchant, category);
    Ok(Out::new(
        format!("'{}' is now {}", record.merchant(), record.category()),
        record,
    ))
}

/// Removes `merchant` from the merchant map. The map is backed up first.
pub async fn forget(config: &Config, merchant: &str) -> Result<Out<bool>> {
    let mut map = MerchantMap::from_config(config).await?;
    if let Some(backup) = config.backup().copy_merchant_map().await? {
        debug!("Backed up the merchant map to {}", backup.display());
    }
    let removed = map.forget(merchant).await?;
    let message = if removed {
        format!("Forgot '{}'", merchant.trim())
    } else {
        format!("'{}' is not in the merchant map", merchant.trim())
    };
    Ok(Out::new(message, removed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_learn() {
        let env = TestEnv::new().await;
        let out = learn(&env.config(), " Blue Bottle ", "Food & Drink")
            .await
            .unwrap();
        assert_eq!(out.message(), "'Blue Bottle' is now Food & Drink");

        learn(&env.config(), "ZZQX 4411", "Pets").await.unwrap();
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(
            map.lookup("BLUE BOTTLE").unwrap().category,
            Category::FoodAndDrink
        );
        assert_eq!(
            map.lookup("zzqx 4411").unwrap().category,
            Category::Custom("Pets".into())
        );
    }

    #[tokio::test]
    async fn test_learn_bad_category() {
        let env = TestEnv::new().await;
        for bad in ["", "  ", "uncategorized"] {
            let err = learn(&env.config(), "Blue Bottle", bad).await.unwrap_err();
            assert_eq!(err.error_type(), ErrorType::Input, "{bad:?}");
        }
        let err = learn(&env.config(), "  ", "Groceries").await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Input);
    }

    #[tokio::test]
    async fn test_forget() {
        let env = TestEnv::new().await;
        env.seed_merchants(&[("Netflix", Category::Entertainment)])
            .await;

        let out = forget(&env.config(), "netflix").await.unwrap();
        assert_eq!(out.structure(), Some(&true));
        let map = MerchantMap::from_config(&env.config()).await.unwrap();
        assert!(map.is_empty());

        let out = forget(&env.config(), "netflix").await.unwrap();
        assert_eq!(out.structure(), Some(&false));

        let backups = std::fs::read_dir(env.config().backups()).unwrap().count();
        assert_eq!(backups, 2);
    }
}

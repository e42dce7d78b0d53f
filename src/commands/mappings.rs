use crate::commands::Out;
use crate::memory::{MerchantMap, MerchantMemory, MerchantRecord};
use crate::{Config, Result};

/// Lists the merchant map in stored order, one `merchant -> category` line per record.
pub async fn mappings(config: &Config) -> Result<Out<Vec<MerchantRecord>>> {
    let map = MerchantMap::from_config(config).await?;
    let records = map.records().to_vec();
    let mut message = format!(
        "{} merchant{} in {}",
        records.len(),
        if records.len() == 1 { "" } else { "s" },
        map.path().display()
    );
    for record in &records {
        message.push_str(&format!("\n  {} -> {}", record.merchant(), record.category()));
    }
    Ok(Out::new(message, records))
}

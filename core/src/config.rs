use crate::types::{ItemId, SimMillis};
use serde::{Deserialize, Serialize};

/// One wholesale catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    pub item_id: ItemId,
    pub unit_cost: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct CatalogFile {
    items: Vec<CatalogItem>,
}

/// One band of the customer price-tolerance distribution.
/// `upper_roll` is the cumulative percentile (0–100) that closes the band.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToleranceTier {
    pub upper_roll: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatisfactionConfig {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
    /// Penalty per desired item rejected on price.
    pub expensive_penalty: f64,
    /// Penalty per desired item not found on the shelf.
    pub not_found_penalty: f64,
    /// Reward per item bought.
    pub purchase_reward: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReputationConfig {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
    /// Reward per item bought.
    pub purchase_reward: f64,
    /// Multiplier on the purchase reward when every desired item was bought.
    pub all_found_multiplier: f64,
    /// Penalty per desired item not bought.
    pub not_found_penalty: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    pub starting_cash: f64,
    pub budget_min: f64,
    pub budget_max: f64,
    pub max_desired_items: usize,
    /// Maximum customers in the shop at once.
    pub capacity: usize,
    /// Seconds between arrivals at reputation 0.
    pub slowest_spawn_secs: f64,
    /// Seconds between arrivals at reputation 100.
    pub fastest_spawn_secs: f64,
    pub tolerance_tiers: Vec<ToleranceTier>,
    pub shopping_delay_ms: SimMillis,
    pub idle_timeout_ms: SimMillis,
    pub till_service_ms: SimMillis,
    pub day_duration_ms: SimMillis,
    pub opening_hour: u32,
    pub closing_hour: u32,
    pub satisfaction: SatisfactionConfig,
    pub reputation: ReputationConfig,
    #[serde(skip)]
    pub catalog: Vec<CatalogItem>,
}

impl ShopConfig {
    /// Load from the data/ directory.
    /// In tests, use ShopConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let shop_path = format!("{data_dir}/shop.json");
        let shop_content = std::fs::read_to_string(&shop_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {shop_path}: {e}"))?;
        let mut config: ShopConfig = serde_json::from_str(&shop_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {shop_path}: {e}"))?;

        let catalog_path = format!("{data_dir}/catalog.json");
        let catalog_content = std::fs::read_to_string(&catalog_path)
            .map_err(|e| anyhow::anyhow!("Cannot read {catalog_path}: {e}"))?;
        let catalog_file: CatalogFile = serde_json::from_str(&catalog_content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {catalog_path}: {e}"))?;
        config.catalog = catalog_file.items;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the simulation cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.catalog.is_empty() {
            anyhow::bail!("wholesale catalog is empty");
        }
        if let Some(bad) = self.catalog.iter().find(|c| !(c.unit_cost.is_finite() && c.unit_cost >= 0.0)) {
            anyhow::bail!("catalog item '{}' has invalid unit cost {}", bad.item_id, bad.unit_cost);
        }
        if self.budget_min < 0.0 || self.budget_max < self.budget_min {
            anyhow::bail!(
                "budget range [{}, {}] is invalid",
                self.budget_min,
                self.budget_max
            );
        }
        if self.capacity == 0 {
            anyhow::bail!("capacity must be at least 1");
        }
        if self.tolerance_tiers.is_empty() {
            anyhow::bail!("at least one tolerance tier is required");
        }
        if self.closing_hour <= self.opening_hour || self.closing_hour > 24 {
            anyhow::bail!(
                "shop hours {}..{} are invalid",
                self.opening_hour,
                self.closing_hour
            );
        }
        Ok(())
    }

    pub fn catalog_item(&self, item_id: &str) -> Option<&CatalogItem> {
        self.catalog.iter().find(|c| c.item_id == item_id)
    }

    /// Config with hardcoded defaults for use in unit tests.
    pub fn default_test() -> Self {
        let catalog = [
            ("Bread", 1.00),
            ("Milk", 0.80),
            ("Eggs", 1.50),
            ("Butter", 1.20),
            ("Cheese", 2.50),
            ("Apples", 0.60),
            ("Bananas", 0.50),
            ("Coffee", 3.00),
            ("Tea", 1.80),
            ("Sugar", 0.90),
            ("Rice", 1.10),
            ("Pasta", 0.95),
        ]
        .into_iter()
        .map(|(item_id, unit_cost)| CatalogItem { item_id: item_id.into(), unit_cost })
        .collect();

        Self {
            starting_cash: 50.0,
            budget_min: 1.0,
            budget_max: 50.0,
            max_desired_items: 10,
            capacity: 10,
            slowest_spawn_secs: 15.0,
            fastest_spawn_secs: 2.0,
            tolerance_tiers: vec![
                ToleranceTier { upper_roll: 80.0, min: 1.25, max: 1.35 },
                ToleranceTier { upper_roll: 90.0, min: 1.20, max: 1.25 },
                ToleranceTier { upper_roll: 100.0, min: 1.35, max: 2.00 },
            ],
            shopping_delay_ms: 2_000,
            idle_timeout_ms: 4_000,
            till_service_ms: 4_000,
            day_duration_ms: 600_000,
            opening_hour: 9,
            closing_hour: 17,
            satisfaction: SatisfactionConfig {
                initial: 100.0,
                min: 0.0,
                max: 100.0,
                expensive_penalty: 0.5,
                not_found_penalty: 0.2,
                purchase_reward: 0.3,
            },
            reputation: ReputationConfig {
                initial: 5.0,
                min: 1.0,
                max: 100.0,
                purchase_reward: 0.1,
                all_found_multiplier: 2.0,
                not_found_penalty: 0.02,
            },
            catalog,
        }
    }
}

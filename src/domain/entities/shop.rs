//! Shop entity - the merchant inventory players can browse

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    pub name: String,
    /// Price in copper pieces
    pub price_cp: u32,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub name: String,
    pub open: bool,
    pub items: Vec<ShopItem>,
}

impl Shop {
    pub fn open(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    /// Add stock, merging with an existing item of the same name
    pub fn add_item(&mut self, item: ShopItem) {
        match self
            .items
            .iter_mut()
            .find(|i| i.name.eq_ignore_ascii_case(&item.name))
        {
            Some(existing) => {
                existing.quantity += item.quantity;
                existing.price_cp = item.price_cp;
            }
            None => self.items.push(item),
        }
    }

    pub fn remove_item(&mut self, name: &str) -> Option<ShopItem> {
        let index = self
            .items
            .iter()
            .position(|i| i.name.eq_ignore_ascii_case(name))?;
        Some(self.items.remove(index))
    }
}

/// Parse prices such as "15 gp", "2sp" or a bare copper count
pub fn parse_price(price: &str) -> Option<u32> {
    let compact: String = price.chars().filter(|c| !c.is_whitespace()).collect();
    let compact = compact.to_lowercase();
    let split = compact
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(compact.len());
    let (amount, unit) = compact.split_at(split);
    let amount: u32 = amount.parse().ok()?;
    let multiplier = match unit {
        "" | "cp" => 1,
        "sp" => 10,
        "ep" => 50,
        "gp" => 100,
        "pp" => 1000,
        _ => return None,
    };
    amount.checked_mul(multiplier)
}

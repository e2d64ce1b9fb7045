use core::str::FromStr;

use serde::{Deserialize, Serialize};

use invenhub_core::DomainError;

/// Catalog category.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Groceries,
    Beverages,
    Household,
    PersonalCare,
    Electronics,
    Clothing,
    Stationery,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Groceries,
        Category::Beverages,
        Category::Household,
        Category::PersonalCare,
        Category::Electronics,
        Category::Clothing,
        Category::Stationery,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Groceries => "groceries",
            Category::Beverages => "beverages",
            Category::Household => "household",
            Category::PersonalCare => "personal_care",
            Category::Electronics => "electronics",
            Category::Clothing => "clothing",
            Category::Stationery => "stationery",
            Category::Other => "other",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| DomainError::validation(format!("unknown category '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_display_forms() {
        assert_eq!("Personal Care".parse::<Category>().unwrap(), Category::PersonalCare);
        assert_eq!("beverages".parse::<Category>().unwrap(), Category::Beverages);
        assert!("weapons".parse::<Category>().is_err());
    }

    #[test]
    fn as_str_round_trips_for_every_category() {
        for c in Category::ALL {
            assert_eq!(c.as_str().parse::<Category>().unwrap(), c);
        }
    }
}

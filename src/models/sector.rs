use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The six sector categories a holding can be filed under. Positions carry
/// the label string itself; grouping is by exact label match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    #[serde(rename = "科技")]
    Technology,
    #[serde(rename = "金融")]
    Finance,
    #[serde(rename = "消费")]
    Consumer,
    #[serde(rename = "医药")]
    Healthcare,
    #[serde(rename = "新能源")]
    NewEnergy,
    #[serde(rename = "制造")]
    Manufacturing,
}

impl Sector {
    pub const ALL: [Sector; 6] = [
        Sector::Technology,
        Sector::Finance,
        Sector::Consumer,
        Sector::Healthcare,
        Sector::NewEnergy,
        Sector::Manufacturing,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Sector::Technology => "科技",
            Sector::Finance => "金融",
            Sector::Consumer => "消费",
            Sector::Healthcare => "医药",
            Sector::NewEnergy => "新能源",
            Sector::Manufacturing => "制造",
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Sector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Sector::ALL
            .iter()
            .copied()
            .find(|sector| sector.label() == s)
            .ok_or_else(|| {
                let labels: Vec<&str> = Sector::ALL.iter().map(Sector::label).collect();
                format!("Unknown sector '{}', expected one of: {}", s, labels.join(", "))
            })
    }
}

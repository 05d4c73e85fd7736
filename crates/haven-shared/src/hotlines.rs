//! Static directory of emergency hotlines shown on the hotline screen.

use std::str::FromStr;

use serde::Serialize;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HotlineCategory {
    Emergency,
    Disaster,
    Medical,
}

impl FromStr for HotlineCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "emergency" => Ok(Self::Emergency),
            "disaster" => Ok(Self::Disaster),
            "medical" => Ok(Self::Medical),
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Hotline {
    pub name: &'static str,
    pub number: &'static str,
    pub category: HotlineCategory,
    pub description: &'static str,
}

pub const HOTLINES: &[Hotline] = &[
    Hotline {
        name: "National Emergency Hotline",
        number: "911",
        category: HotlineCategory::Emergency,
        description: "Integrated Police, Fire, Medical emergencies",
    },
    Hotline {
        name: "Silang OMDRRMO Command Center",
        number: "0917-142-3776",
        category: HotlineCategory::Disaster,
        description: "Disaster management and response coordination",
    },
    Hotline {
        name: "Silang OMDRRMO Operations (Globe)",
        number: "0935-601-6738",
        category: HotlineCategory::Disaster,
        description: "Emergency operations support",
    },
    Hotline {
        name: "Silang OMDRRMO Operations (Smart)",
        number: "0922-384-6130",
        category: HotlineCategory::Disaster,
        description: "Emergency operations support",
    },
    Hotline {
        name: "Silang OMDRRMO Landline",
        number: "(046) 414-3776",
        category: HotlineCategory::Disaster,
        description: "Direct landline for emergency coordination",
    },
    Hotline {
        name: "Philippine Red Cross - Silang Branch",
        number: "(046) 885-7481",
        category: HotlineCategory::Medical,
        description: "Medical assistance and rescue services",
    },
    Hotline {
        name: "Philippine Red Cross - Silang (Mobile)",
        number: "0916-474-3235",
        category: HotlineCategory::Medical,
        description: "Mobile emergency medical support",
    },
];

/// Hotlines in `category`, or all of them when `None`.
pub fn by_category(category: Option<HotlineCategory>) -> Vec<&'static Hotline> {
    HOTLINES
        .iter()
        .filter(|h| category.map_or(true, |c| h.category == c))
        .collect()
}

//! The fixed inspection checklist. Each field accepts a closed set of options;
//! rules can only be written against these pairs.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChecklistField {
    Helmet,
    Box,
    Account,
    Parking,
    Appearance,
    Driving,
    MfcStatus,
    CourierBehavior,
}

impl ChecklistField {
    pub const ALL: [ChecklistField; 8] = [
        ChecklistField::Helmet,
        ChecklistField::Box,
        ChecklistField::Account,
        ChecklistField::Parking,
        ChecklistField::Appearance,
        ChecklistField::Driving,
        ChecklistField::MfcStatus,
        ChecklistField::CourierBehavior,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChecklistField::Helmet => "helmet",
            ChecklistField::Box => "box",
            ChecklistField::Account => "account",
            ChecklistField::Parking => "parking",
            ChecklistField::Appearance => "appearance",
            ChecklistField::Driving => "driving",
            ChecklistField::MfcStatus => "mfc_status",
            ChecklistField::CourierBehavior => "courier_behavior",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == name.trim())
    }

    pub fn options(self) -> &'static [&'static str] {
        match self {
            ChecklistField::Helmet => &["Yes", "No"],
            ChecklistField::Box => &["Clean", "Dirty or torn", "Does not have a box"],
            ChecklistField::Account => &["Valid", "Rented", "Refused to provide account or CIN."],
            ChecklistField::Parking => &[
                "Valid - in a dedicated area",
                "Not valid - in a prohibited area",
            ],
            ChecklistField::Appearance => &[
                "Valid - Decent attire with gilet",
                "Valid - Decent attire sans gilet",
                "Not valid - wearing pyjama, Sandals, sabots etc",
            ],
            ChecklistField::Driving => &[
                "Reckless driving",
                "Overspeed",
                "One way driving",
                "Good Behavior",
            ],
            ChecklistField::MfcStatus => &[
                "Ongoing order - waiting for pick up",
                "Not ongoing order - waiting for new order",
            ],
            ChecklistField::CourierBehavior => &[
                "Valid - Collaborative, respectful",
                "Not valid - Not collaborative",
            ],
        }
    }

    pub fn accepts(self, value: &str) -> bool {
        self.options().contains(&value)
    }

    /// Message used when `value` is not one of the options.
    pub fn rejection(self, value: &str) -> String {
        format!(
            "'{value}' is not a valid option for {}; expected one of: {}",
            self.as_str(),
            self.options().join(" | ")
        )
    }
}

impl fmt::Display for ChecklistField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn field_names() -> String {
    ChecklistField::ALL
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

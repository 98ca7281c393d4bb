//! In-memory configuration tree.
//!
//! The core accepts plain deserializable structs; no file format is
//! prescribed. Settings resolve per district: an explicit override wins,
//! an override may point at a named group shared by several districts,
//! and everything else falls back to the default block. An optional
//! global block adds cross-district permeability caps.

use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A party's observed result in one district.
#[derive(Debug, Clone, Deserialize)]
pub struct PartyData {
    pub votes: f64,
    pub wing: String,
}

/// One district's observed input.
#[derive(Debug, Clone, Deserialize)]
pub struct DistrictData {
    pub num_seats: u32,
    pub parties: BTreeMap<String, PartyData>,
}

/// An objective weight: a literal coefficient, or the `"auto<factor>"`
/// sentinel deriving a movement penalty of
/// `-factor * num_seats / total_votes` for the owning district.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Weight {
    Fixed(f64),
    Auto(f64),
}

impl Weight {
    /// Resolve to a concrete coefficient for a district of the given
    /// size.
    pub fn resolve(&self, num_seats: u32, total_votes: f64) -> f64 {
        match self {
            Weight::Fixed(value) => *value,
            Weight::Auto(factor) => {
                if total_votes > 0.0 {
                    -factor * (num_seats as f64 / total_votes)
                } else {
                    0.0
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for Weight {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Ok(Weight::Fixed(value)),
            Raw::Text(text) => {
                let factor = text
                    .strip_prefix("auto")
                    .and_then(|rest| rest.parse::<f64>().ok())
                    .ok_or_else(|| {
                        serde::de::Error::custom(format!("invalid weight string '{}'", text))
                    })?;
                Ok(Weight::Auto(factor))
            }
        }
    }
}

type PairMap<V> = BTreeMap<String, BTreeMap<String, V>>;

/// Objective weight maps with per-kind defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub party_seats: BTreeMap<String, f64>,
    pub wing_seats: BTreeMap<String, f64>,
    pub party_movements: PairMap<Weight>,
    pub wing_movements: PairMap<Weight>,
    pub default_party_seats: f64,
    pub default_wing_seats: f64,
    pub default_party_movements: Weight,
    pub default_wing_movements: Weight,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        ObjectiveWeights {
            party_seats: BTreeMap::new(),
            wing_seats: BTreeMap::new(),
            party_movements: BTreeMap::new(),
            wing_movements: BTreeMap::new(),
            default_party_seats: -1.0,
            default_wing_seats: -1.0,
            default_party_movements: Weight::Fixed(-1.0),
            default_wing_movements: Weight::Fixed(-1.0),
        }
    }
}

impl ObjectiveWeights {
    pub fn party_seat_weight(&self, party: &str) -> f64 {
        self.party_seats
            .get(party)
            .copied()
            .unwrap_or(self.default_party_seats)
    }

    pub fn wing_seat_weight(&self, wing: &str) -> f64 {
        self.wing_seats
            .get(wing)
            .copied()
            .unwrap_or(self.default_wing_seats)
    }

    pub fn party_movement_weight(&self, from: &str, to: &str) -> Weight {
        self.party_movements
            .get(from)
            .and_then(|m| m.get(to))
            .copied()
            .unwrap_or(self.default_party_movements)
    }

    pub fn wing_movement_weight(&self, from: &str, to: &str) -> Weight {
        self.wing_movements
            .get(from)
            .and_then(|m| m.get(to))
            .copied()
            .unwrap_or(self.default_wing_movements)
    }
}

/// Per-district tunables: permeability maps, objective weights, and the
/// first contested round.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DistrictSettings {
    pub party_permeability: PairMap<f64>,
    pub wing_permeability: PairMap<f64>,
    pub weights: ObjectiveWeights,
    pub default_party_permeability: f64,
    pub default_wing_permeability: f64,
    pub first_contested_seat: u32,
}

impl Default for DistrictSettings {
    fn default() -> Self {
        DistrictSettings {
            party_permeability: BTreeMap::new(),
            wing_permeability: BTreeMap::new(),
            weights: ObjectiveWeights::default(),
            default_party_permeability: 0.0,
            default_wing_permeability: 1.0,
            first_contested_seat: 1,
        }
    }
}

impl DistrictSettings {
    /// The maximum fraction of `from`'s initial votes that may move to
    /// `to`, at party granularity.
    pub fn party_permeability(&self, from: &str, to: &str) -> f64 {
        self.party_permeability
            .get(from)
            .and_then(|m| m.get(to))
            .copied()
            .unwrap_or(self.default_party_permeability)
    }

    /// Same, at wing granularity.
    pub fn wing_permeability(&self, from: &str, to: &str) -> f64 {
        self.wing_permeability
            .get(from)
            .and_then(|m| m.get(to))
            .copied()
            .unwrap_or(self.default_wing_permeability)
    }
}

/// A district's settings entry: either a reference to a shared group or
/// an inline block.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SettingsRef {
    Group { group: String },
    Inline(DistrictSettings),
}

/// Cross-district permeability caps: a default plus per-pair overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalPermeability {
    pub default: f64,
    pub pairs: PairMap<f64>,
}

impl Default for GlobalPermeability {
    fn default() -> Self {
        GlobalPermeability {
            default: 1.0,
            pairs: BTreeMap::new(),
        }
    }
}

impl GlobalPermeability {
    pub fn get(&self, from: &str, to: &str) -> f64 {
        self.pairs
            .get(from)
            .and_then(|m| m.get(to))
            .copied()
            .unwrap_or(self.default)
    }
}

/// Optional national-level caps on cumulative cross-district outflow.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GlobalSettings {
    pub parties: GlobalPermeability,
    pub wings: GlobalPermeability,
}

/// The full settings tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default: DistrictSettings,
    pub overrides: BTreeMap<String, SettingsRef>,
    pub groups: BTreeMap<String, DistrictSettings>,
    pub global: Option<GlobalSettings>,
}

/// Root configuration: observed districts plus the settings tree.
#[derive(Debug, Clone, Deserialize)]
pub struct ElectionConfig {
    pub districts: BTreeMap<String, DistrictData>,
    #[serde(default)]
    pub settings: Settings,
}

impl ElectionConfig {
    /// Fail-fast validation pass, run before any variable is declared.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.districts.is_empty() {
            return Err(ConfigError::NoDistricts);
        }

        for (name, data) in &self.districts {
            if data.num_seats == 0 {
                return Err(ConfigError::ZeroSeats {
                    district: name.clone(),
                });
            }
            if data.parties.is_empty() {
                return Err(ConfigError::NoParties {
                    district: name.clone(),
                });
            }
            for (party, party_data) in &data.parties {
                if party_data.votes < 0.0 {
                    return Err(ConfigError::NegativeVotes {
                        district: name.clone(),
                        party: party.clone(),
                        votes: party_data.votes,
                    });
                }
                if party_data.wing.is_empty() {
                    return Err(ConfigError::MissingWing {
                        district: name.clone(),
                        party: party.clone(),
                    });
                }
            }

            let settings = self.settings_for(name)?;
            let first = settings.first_contested_seat;
            if first < 1 || first > data.num_seats {
                return Err(ConfigError::BadFirstContestedSeat {
                    district: name.clone(),
                    first_contested_seat: first,
                    num_seats: data.num_seats,
                });
            }
        }

        Ok(())
    }

    /// Resolve the settings block applying to a district.
    pub fn settings_for(&self, district: &str) -> Result<&DistrictSettings, ConfigError> {
        match self.settings.overrides.get(district) {
            Some(SettingsRef::Group { group }) => {
                self.settings
                    .groups
                    .get(group)
                    .ok_or_else(|| ConfigError::UnknownGroup {
                        district: district.to_string(),
                        group: group.clone(),
                    })
            }
            Some(SettingsRef::Inline(settings)) => Ok(settings),
            None => Ok(&self.settings.default),
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    fn two_district_config() -> ElectionConfig {
        serde_json::from_value(serde_json::json!({
            "districts": {
                "north": {
                    "num_seats": 5,
                    "parties": {
                        "a": { "votes": 100.0, "wing": "left" },
                        "b": { "votes": 80.0, "wing": "right" }
                    }
                },
                "south": {
                    "num_seats": 3,
                    "parties": {
                        "a": { "votes": 60.0, "wing": "left" },
                        "b": { "votes": 40.0, "wing": "right" }
                    }
                }
            },
            "settings": {
                "overrides": {
                    "south": { "group": "small" }
                },
                "groups": {
                    "small": { "first_contested_seat": 2 }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn weight_from_number_or_auto_string() {
        let fixed: Weight = serde_json::from_value(serde_json::json!(-2.5)).unwrap();
        assert_eq!(fixed, Weight::Fixed(-2.5));

        let auto: Weight = serde_json::from_value(serde_json::json!("auto1.5")).unwrap();
        assert_eq!(auto, Weight::Auto(1.5));

        let bad: Result<Weight, _> = serde_json::from_value(serde_json::json!("automatic"));
        assert!(bad.is_err());
    }

    #[test]
    fn weight_resolution() {
        assert_eq!(Weight::Fixed(-0.5).resolve(5, 250.0), -0.5);
        assert_eq!(Weight::Auto(2.0).resolve(5, 250.0), -2.0 * 5.0 / 250.0);
        assert_eq!(Weight::Auto(2.0).resolve(5, 0.0), 0.0);
    }

    #[test]
    fn settings_resolution_prefers_override_then_group_then_default() {
        let config = two_district_config();
        assert_eq!(config.settings_for("north").unwrap().first_contested_seat, 1);
        assert_eq!(config.settings_for("south").unwrap().first_contested_seat, 2);
    }

    #[test]
    fn unknown_group_is_rejected() {
        let mut config = two_district_config();
        config.settings.overrides.insert(
            "north".to_string(),
            SettingsRef::Group {
                group: "missing".to_string(),
            },
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnknownGroup { .. })
        ));
    }

    #[test]
    fn validation_rejects_malformed_input() {
        let empty = ElectionConfig {
            districts: BTreeMap::new(),
            settings: Settings::default(),
        };
        assert_eq!(empty.validate(), Err(ConfigError::NoDistricts));

        let mut config = two_district_config();
        config
            .districts
            .get_mut("north")
            .unwrap()
            .parties
            .get_mut("a")
            .unwrap()
            .votes = -1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeVotes { .. })
        ));

        let mut config = two_district_config();
        config.districts.get_mut("north").unwrap().num_seats = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroSeats { .. })));
    }

    #[test]
    fn first_contested_seat_must_fit_district() {
        let mut config = two_district_config();
        config.districts.get_mut("south").unwrap().num_seats = 1;
        // "south" resolves to the "small" group with first_contested_seat = 2.
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadFirstContestedSeat { .. })
        ));
    }

    #[test]
    fn permeability_defaults_apply() {
        let settings = DistrictSettings::default();
        assert_eq!(settings.party_permeability("a", "b"), 0.0);
        assert_eq!(settings.wing_permeability("left", "right"), 1.0);

        let mut settings = DistrictSettings::default();
        settings
            .party_permeability
            .entry("a".to_string())
            .or_default()
            .insert("b".to_string(), 0.25);
        assert_eq!(settings.party_permeability("a", "b"), 0.25);
        assert_eq!(settings.party_permeability("b", "a"), 0.0);
    }

    #[test]
    fn objective_weight_defaults_apply() {
        let weights = ObjectiveWeights::default();
        assert_eq!(weights.party_seat_weight("anyone"), -1.0);
        assert_eq!(weights.wing_seat_weight("anyone"), -1.0);
        assert_eq!(
            weights.party_movement_weight("a", "b"),
            Weight::Fixed(-1.0)
        );
    }
}

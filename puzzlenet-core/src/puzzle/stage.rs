//! Stages and the fixed, forward-only stage order of each puzzle variant.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    WaitingTag1,
    KeypadActive,
    WaitingTag2,
    WaitingMagnet,
    LanguageSelect,
    WaitingCompartment,
    Completed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::WaitingTag1 => "WAITING_TAG1",
            Stage::KeypadActive => "KEYPAD_ACTIVE",
            Stage::WaitingTag2 => "WAITING_TAG2",
            Stage::WaitingMagnet => "WAITING_MAGNET",
            Stage::LanguageSelect => "LANGUAGE_SELECT",
            Stage::WaitingCompartment => "WAITING_COMPARTMENT",
            Stage::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const SUITCASE: &[Stage] = &[
    Stage::WaitingTag1,
    Stage::KeypadActive,
    Stage::WaitingTag2,
    Stage::LanguageSelect,
    Stage::Completed,
];

const MAGNET_BOX: &[Stage] = &[
    Stage::WaitingTag1,
    Stage::KeypadActive,
    Stage::WaitingMagnet,
    Stage::WaitingCompartment,
    Stage::Completed,
];

/// Physical puzzle build. Each variant owns one stage table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Tag → code → second tag → language choice.
    #[default]
    Suitcase,
    /// Tag → code → magnetic contact → compartment choice.
    MagnetBox,
}

impl Variant {
    pub fn stages(&self) -> &'static [Stage] {
        match self {
            Variant::Suitcase => SUITCASE,
            Variant::MagnetBox => MAGNET_BOX,
        }
    }

    pub fn initial(&self) -> Stage {
        self.stages()[0]
    }

    pub fn position(&self, stage: Stage) -> Option<usize> {
        self.stages().iter().position(|s| *s == stage)
    }

    /// Stage after `stage`, or None at the end (or for a stage not in this variant).
    pub fn next(&self, stage: Stage) -> Option<Stage> {
        let i = self.position(stage)?;
        self.stages().get(i + 1).copied()
    }

    pub fn has(&self, stage: Stage) -> bool {
        self.position(stage).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_start_and_end_alike() {
        for v in [Variant::Suitcase, Variant::MagnetBox] {
            assert_eq!(v.initial(), Stage::WaitingTag1);
            assert_eq!(*v.stages().last().unwrap(), Stage::Completed);
            assert_eq!(v.next(Stage::Completed), None);
        }
    }

    #[test]
    fn code_stage_leads_to_variant_specific_wait() {
        assert_eq!(
            Variant::Suitcase.next(Stage::KeypadActive),
            Some(Stage::WaitingTag2)
        );
        assert_eq!(
            Variant::MagnetBox.next(Stage::KeypadActive),
            Some(Stage::WaitingMagnet)
        );
        assert_eq!(Variant::Suitcase.next(Stage::WaitingMagnet), None);
        assert!(!Variant::MagnetBox.has(Stage::LanguageSelect));
    }

    #[test]
    fn stage_serializes_as_screaming_name() {
        for s in Variant::Suitcase.stages().iter().chain(Variant::MagnetBox.stages()) {
            let json = serde_json::to_string(s).unwrap();
            assert_eq!(json, format!("\"{}\"", s.as_str()));
        }
    }
}

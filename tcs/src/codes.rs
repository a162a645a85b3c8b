//! ASCOL code tables
//!
//! Static bidirectional maps from protocol codes to semantic labels, one
//! per readable status axis. Every code real hardware can return has an
//! entry; decoding an unknown code fails loudly so ambiguous device state
//! is never masked.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodeError {
    #[error("{table}: unrecognised code '{code}' from hardware")]
    UnknownCode { table: &'static str, code: String },

    #[error("{table}: no code for label '{label}'")]
    UnknownLabel { table: &'static str, label: String },
}

/// A finite bijection between protocol codes and semantic labels.
#[derive(Debug, Clone, Copy)]
pub struct CodeTable {
    name: &'static str,
    entries: &'static [(&'static str, &'static str)],
}

impl CodeTable {
    pub const fn new(
        name: &'static str,
        entries: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Protocol code -> semantic label.
    pub fn decode(&self, code: &str) -> Result<&'static str, CodeError> {
        self.entries
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, label)| *label)
            .ok_or_else(|| CodeError::UnknownCode {
                table: self.name,
                code: code.to_string(),
            })
    }

    /// Semantic label -> protocol code (used where a setter exists).
    pub fn encode(&self, label: &str) -> Result<&'static str, CodeError> {
        self.entries
            .iter()
            .find(|(_, l)| *l == label)
            .map(|(code, _)| *code)
            .ok_or_else(|| CodeError::UnknownLabel {
                table: self.name,
                label: label.to_string(),
            })
    }

    pub fn labels(&self) -> impl Iterator<Item = &'static str> {
        self.entries.iter().map(|(_, label)| *label)
    }

    pub fn entries(&self) -> &'static [(&'static str, &'static str)] {
        self.entries
    }
}

/// GLobal LoGin result.
pub static GLLG: CodeTable = CodeTable::new(
    "GLLG",
    &[("0", "wrong password"), ("1", "correct password")],
);

/// GLobal read REmote state.
pub static GLRE: CodeTable = CodeTable::new("GLRE", &[("0", "local"), ("1", "remote")]);

/// GLobal read Safety Relay state.
pub static GLSR: CodeTable = CodeTable::new("GLSR", &[("0", "open"), ("1", "closed")]);

/// Pier side token in TRRD replies and TSRA arguments.
pub static TRRD_SIDE: CodeTable = CodeTable::new("TRRD", &[("0", "east"), ("1", "west")]);

/// TElescope Read State.
pub static TERS: CodeTable = CodeTable::new(
    "TERS",
    &[
        ("00", "switched off"),
        ("01", "switching off"),
        ("02", "switching on 1"),
        ("03", "switching on 2"),
        ("04", "ready"),
        ("05", "sky track"),
        ("06", "mechanical slew"),
        ("07", "sky slew"),
        ("08", "mechanical flip"),
        ("09", "sky flip"),
        ("10", "parking"),
        ("11", "parked"),
        ("12", "initializing"),
    ],
);

/// DOme Read State.
pub static DORS: CodeTable = CodeTable::new(
    "DORS",
    &[
        ("00", "stopped"),
        ("01", "slew -"),
        ("02", "slew +"),
        ("03", "auto"),
        ("04", "auto -"),
        ("05", "auto +"),
        ("06", "manual -"),
        ("07", "manual +"),
        ("08", "parking"),
        ("09", "parking -"),
        ("10", "parking +"),
        ("11", "initializing"),
    ],
);

/// DOme read Slit State.
pub static DOSS: CodeTable = CodeTable::new(
    "DOSS",
    &[
        ("00", "stopped"),
        ("01", "opening"),
        ("02", "closing"),
        ("03", "open"),
        ("04", "closed"),
    ],
);

/// Flap Cassegrain Read State.
pub static FCRS: CodeTable = CodeTable::new(
    "FCRS",
    &[
        ("00", "stopped"),
        ("01", "opening"),
        ("02", "closing"),
        ("03", "open"),
        ("04", "closed"),
    ],
);

/// Flap Mirror Read State.
pub static FMRS: CodeTable = CodeTable::new(
    "FMRS",
    &[
        ("00", "stopped"),
        ("01", "opening"),
        ("02", "closing"),
        ("03", "open"),
        ("04", "closed"),
    ],
);

/// FASU Wheel A Read Position. Position 8 is the transient between-positions
/// state and is not settable.
pub static WARP: CodeTable = CodeTable::new(
    "WARP",
    &[
        ("0", "empty"),
        ("1", "Stromgr u"),
        ("2", "Stromgr v"),
        ("3", "Stromgr b"),
        ("4", "Stromgr y"),
        ("5", "OII"),
        ("6", "g2"),
        ("7", "OIII"),
        ("8", "rotating"),
    ],
);

/// FASU Wheel A Read State.
pub static WARS: CodeTable = CodeTable::new(
    "WARS",
    &[
        ("00", "stopped"),
        ("01", "positioning +"),
        ("02", "positioning -"),
        ("03", "positioning"),
        ("04", "locked"),
    ],
);

/// FASU Wheel B Read Position. Position 7 is the transient state.
pub static WBRP: CodeTable = CodeTable::new(
    "WBRP",
    &[
        ("0", "empty"),
        ("1", "U"),
        ("2", "B"),
        ("3", "V"),
        ("4", "R"),
        ("5", "I"),
        ("6", "H-alpha rs"),
        ("7", "rotating"),
    ],
);

/// FASU Wheel B Read State.
pub static WBRS: CodeTable = CodeTable::new(
    "WBRS",
    &[
        ("00", "stopped"),
        ("01", "positioning +"),
        ("02", "positioning -"),
        ("03", "positioning"),
        ("04", "locked"),
    ],
);

/// SHutter Read Position.
pub static SHRP: CodeTable = CodeTable::new("SHRP", &[("0", "closed"), ("1", "open")]);

/// FOcus Read State.
pub static FORS: CodeTable = CodeTable::new(
    "FORS",
    &[
        ("00", "stopped"),
        ("01", "positioning"),
        ("02", "manual -"),
        ("03", "manual +"),
    ],
);

/// MEteo PRecipitation reading.
pub static MEPR: CodeTable = CodeTable::new("MEPR", &[("0", "no"), ("1", "yes")]);

/// Shared validity flag on every meteo value pair.
pub static VALIDITY: CodeTable =
    CodeTable::new("validity", &[("0", "not valid"), ("1", "valid")]);

/// Every table, for exhaustive checks.
pub fn all_tables() -> [&'static CodeTable; 16] {
    [
        &GLLG, &GLRE, &GLSR, &TRRD_SIDE, &TERS, &DORS, &DOSS, &FCRS, &FMRS, &WARP, &WARS,
        &WBRP, &WBRS, &SHRP, &FORS, &MEPR,
    ]
}

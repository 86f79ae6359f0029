use std::fmt::{self, Display};

use serde::{Serialize, Deserialize};

use crate::error::Error;

/// The five coarse classes every connection record resolves to. The raw
/// dataset carries attack subtypes (neptune, smurf, ipsweep, ...); those are
/// collapsed through a fixed vocabulary before any model sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Dos,
    Probe,
    R2l,
    U2r,
    Normal
}

/// Subtypes marked denial-of-service. The first six appear in the training
/// set; the remainder only in the corrected test set.
const DOS : [&str; 10] = [
    "back", "land", "neptune", "pod", "smurf", "teardrop",
    "apache2", "mailbomb", "processtable", "udpstorm"
];

const PROBE : [&str; 6] = [
    "ipsweep", "nmap", "portsweep", "satan",
    "mscan", "saint"
];

const R2L : [&str; 15] = [
    "ftp_write", "guess_passwd", "imap", "multihop", "phf", "spy",
    "warezclient", "warezmaster",
    "named", "sendmail", "snmpgetattack", "snmpguess", "worm", "xlock", "xsnoop"
];

const U2R : [&str; 8] = [
    "buffer_overflow", "loadmodule", "perl", "rootkit",
    "httptunnel", "ps", "sqlattack", "xterm"
];

impl Label {

    /// All labels, in the fixed order used by confusion matrices and
    /// class-indexed vectors throughout the crate.
    pub const ALL : [Label; 5] = [Label::Dos, Label::Probe, Label::R2l, Label::U2r, Label::Normal];

    /// Position of this label in [Label::ALL].
    pub fn index(&self) -> usize {
        match self {
            Label::Dos => 0,
            Label::Probe => 1,
            Label::R2l => 2,
            Label::U2r => 3,
            Label::Normal => 4
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Label::Dos => "DoS",
            Label::Probe => "Probe",
            Label::R2l => "R2L",
            Label::U2r => "U2R",
            Label::Normal => "normal"
        }
    }

}

impl Display for Label {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }

}

/// Resolves a raw label string to its coarse class. Test-set labels carry a
/// trailing "." which training labels do not, so a single trailing dot is
/// stripped before lookup. A value outside the fixed vocabulary means the
/// code and the dataset have drifted apart, and the run must abort rather
/// than silently drop the record.
pub fn normalize(raw : &str) -> Result<Label, Error> {
    let stripped = raw.strip_suffix('.').unwrap_or(raw);
    if stripped == "normal" {
        return Ok(Label::Normal);
    }
    if DOS.contains(&stripped) {
        Ok(Label::Dos)
    } else if PROBE.contains(&stripped) {
        Ok(Label::Probe)
    } else if R2L.contains(&stripped) {
        Ok(Label::R2l)
    } else if U2R.contains(&stripped) {
        Ok(Label::U2r)
    } else {
        Err(Error::UnknownLabel(raw.to_string()))
    }
}

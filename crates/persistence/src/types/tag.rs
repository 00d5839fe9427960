//! DICOM attribute tags, value representations and the attribute dictionary
//! used by the archive schema.

// Tag constants are named after their dictionary keywords
#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A DICOM attribute tag (group, element).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Tag {
    group: u16,
    element: u16,
}

impl Tag {
    /// Creates a tag from its group and element numbers.
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }

    /// Returns the group number.
    pub fn group(&self) -> u16 {
        self.group
    }

    /// Returns the element number.
    pub fn element(&self) -> u16 {
        self.element
    }

    /// Returns the eight-digit hex form used as DICOM JSON key, e.g. `0020000D`.
    pub fn to_hex(&self) -> String {
        format!("{:04X}{:04X}", self.group, self.element)
    }

    /// Returns the dictionary keyword for this tag, if known.
    pub fn keyword(&self) -> Option<&'static str> {
        lookup(*self).map(|entry| entry.keyword)
    }

    /// Returns the dictionary VR for this tag, if known.
    pub fn vr(&self) -> Option<Vr> {
        lookup(*self).map(|entry| entry.vr)
    }

    /// Resolves a tag from a keyword (`StudyInstanceUID`) or hex form (`0020000D`).
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        DICTIONARY
            .iter()
            .find(|entry| entry.keyword.eq_ignore_ascii_case(keyword))
            .map(|entry| entry.tag)
            .or_else(|| keyword.parse().ok())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .chars()
            .filter(|c| !matches!(c, '(' | ')' | ','))
            .collect();
        if hex.len() != 8 || !hex.is_ascii() {
            return Err(format!("invalid tag: {}", s));
        }
        let group = u16::from_str_radix(&hex[..4], 16).map_err(|_| format!("invalid tag: {}", s))?;
        let element =
            u16::from_str_radix(&hex[4..], 16).map_err(|_| format!("invalid tag: {}", s))?;
        Ok(Tag::new(group, element))
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_hex()
    }
}

impl TryFrom<String> for Tag {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// DICOM value representations used by archive attributes.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vr {
    /// Application Entity
    AE,
    /// Code String
    CS,
    /// Date
    DA,
    /// Decimal String
    DS,
    /// Date Time
    DT,
    /// Integer String
    IS,
    /// Long String
    LO,
    /// Person Name
    PN,
    /// Short String
    SH,
    /// Time
    TM,
    /// Unique Identifier
    UI,
    /// Unsigned Long
    UL,
    /// Unsigned Short
    US,
}

impl Vr {
    /// Returns the two-letter code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Vr::AE => "AE",
            Vr::CS => "CS",
            Vr::DA => "DA",
            Vr::DS => "DS",
            Vr::DT => "DT",
            Vr::IS => "IS",
            Vr::LO => "LO",
            Vr::PN => "PN",
            Vr::SH => "SH",
            Vr::TM => "TM",
            Vr::UI => "UI",
            Vr::UL => "UL",
            Vr::US => "US",
        }
    }

    /// Returns true for VRs whose values support range matching.
    pub fn supports_range(&self) -> bool {
        matches!(self, Vr::DA | Vr::TM | Vr::DT)
    }

    /// Returns true for VRs encoded as JSON numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Vr::IS | Vr::DS | Vr::UL | Vr::US)
    }
}

impl fmt::Display for Vr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dictionary entry.
#[derive(Debug, Clone, Copy)]
pub struct DictionaryEntry {
    /// The attribute tag.
    pub tag: Tag,
    /// The attribute keyword.
    pub keyword: &'static str,
    /// The attribute VR.
    pub vr: Vr,
}

pub const PATIENT_NAME: Tag = Tag::new(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag::new(0x0010, 0x0020);
pub const PATIENT_BIRTH_DATE: Tag = Tag::new(0x0010, 0x0030);
pub const PATIENT_SEX: Tag = Tag::new(0x0010, 0x0040);
pub const STUDY_INSTANCE_UID: Tag = Tag::new(0x0020, 0x000D);
pub const STUDY_ID: Tag = Tag::new(0x0020, 0x0010);
pub const STUDY_DATE: Tag = Tag::new(0x0008, 0x0020);
pub const STUDY_TIME: Tag = Tag::new(0x0008, 0x0030);
pub const ACCESSION_NUMBER: Tag = Tag::new(0x0008, 0x0050);
pub const REFERRING_PHYSICIAN_NAME: Tag = Tag::new(0x0008, 0x0090);
pub const STUDY_DESCRIPTION: Tag = Tag::new(0x0008, 0x1030);
pub const MODALITIES_IN_STUDY: Tag = Tag::new(0x0008, 0x0061);
pub const NUMBER_OF_STUDY_RELATED_SERIES: Tag = Tag::new(0x0020, 0x1206);
pub const NUMBER_OF_STUDY_RELATED_INSTANCES: Tag = Tag::new(0x0020, 0x1208);
pub const SERIES_INSTANCE_UID: Tag = Tag::new(0x0020, 0x000E);
pub const SERIES_NUMBER: Tag = Tag::new(0x0020, 0x0011);
pub const SERIES_DATE: Tag = Tag::new(0x0008, 0x0021);
pub const MODALITY: Tag = Tag::new(0x0008, 0x0060);
pub const SERIES_DESCRIPTION: Tag = Tag::new(0x0008, 0x103E);
pub const BODY_PART_EXAMINED: Tag = Tag::new(0x0018, 0x0015);
pub const NUMBER_OF_SERIES_RELATED_INSTANCES: Tag = Tag::new(0x0020, 0x1209);
pub const SOP_CLASS_UID: Tag = Tag::new(0x0008, 0x0016);
pub const SOP_INSTANCE_UID: Tag = Tag::new(0x0008, 0x0018);
pub const INSTANCE_NUMBER: Tag = Tag::new(0x0020, 0x0013);
pub const TRANSFER_SYNTAX_UID: Tag = Tag::new(0x0002, 0x0010);

const fn entry(tag: Tag, keyword: &'static str, vr: Vr) -> DictionaryEntry {
    DictionaryEntry { tag, keyword, vr }
}

/// Attributes known to the archive.
pub static DICTIONARY: &[DictionaryEntry] = &[
    entry(PATIENT_NAME, "PatientName", Vr::PN),
    entry(PATIENT_ID, "PatientID", Vr::LO),
    entry(PATIENT_BIRTH_DATE, "PatientBirthDate", Vr::DA),
    entry(PATIENT_SEX, "PatientSex", Vr::CS),
    entry(STUDY_INSTANCE_UID, "StudyInstanceUID", Vr::UI),
    entry(STUDY_ID, "StudyID", Vr::SH),
    entry(STUDY_DATE, "StudyDate", Vr::DA),
    entry(STUDY_TIME, "StudyTime", Vr::TM),
    entry(ACCESSION_NUMBER, "AccessionNumber", Vr::SH),
    entry(REFERRING_PHYSICIAN_NAME, "ReferringPhysicianName", Vr::PN),
    entry(STUDY_DESCRIPTION, "StudyDescription", Vr::LO),
    entry(MODALITIES_IN_STUDY, "ModalitiesInStudy", Vr::CS),
    entry(NUMBER_OF_STUDY_RELATED_SERIES, "NumberOfStudyRelatedSeries", Vr::IS),
    entry(NUMBER_OF_STUDY_RELATED_INSTANCES, "NumberOfStudyRelatedInstances", Vr::IS),
    entry(SERIES_INSTANCE_UID, "SeriesInstanceUID", Vr::UI),
    entry(SERIES_NUMBER, "SeriesNumber", Vr::IS),
    entry(SERIES_DATE, "SeriesDate", Vr::DA),
    entry(MODALITY, "Modality", Vr::CS),
    entry(SERIES_DESCRIPTION, "SeriesDescription", Vr::LO),
    entry(BODY_PART_EXAMINED, "BodyPartExamined", Vr::CS),
    entry(NUMBER_OF_SERIES_RELATED_INSTANCES, "NumberOfSeriesRelatedInstances", Vr::IS),
    entry(SOP_CLASS_UID, "SOPClassUID", Vr::UI),
    entry(SOP_INSTANCE_UID, "SOPInstanceUID", Vr::UI),
    entry(INSTANCE_NUMBER, "InstanceNumber", Vr::IS),
    entry(TRANSFER_SYNTAX_UID, "TransferSyntaxUID", Vr::UI),
];

fn lookup(tag: Tag) -> Option<&'static DictionaryEntry> {
    DICTIONARY.iter().find(|entry| entry.tag == tag)
}

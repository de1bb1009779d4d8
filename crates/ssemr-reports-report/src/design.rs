//! Report designs
//!
//! A design points a report at a template and says where each dataset's rows
//! repeat within it.

use crate::error::{ReportError, ReportResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use winnow::ascii::{dec_uint, space0};
use winnow::combinator::{preceded, terminated};
use winnow::error::{ContextError, ErrMode, ModalResult};
use winnow::prelude::*;
use winnow::token::take_while;

/// Template-based rendering of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportDesign {
    pub uuid: String,
    pub name: String,
    /// Template resource name, resolved through a `TemplateStore`
    pub template: String,
    #[serde(default)]
    pub repeating_sections: Vec<RepeatingSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_weight: Option<u32>,
}

impl ReportDesign {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            template: template.into(),
            repeating_sections: Vec::new(),
            sort_weight: None,
        }
    }

    pub fn with_section(mut self, section: RepeatingSection) -> Self {
        self.repeating_sections.push(section);
        self
    }

    pub fn with_sort_weight(mut self, weight: u32) -> Self {
        self.sort_weight = Some(weight);
        self
    }

    /// Design properties as the template renderer reads them
    pub fn properties(&self) -> IndexMap<String, String> {
        let mut props = IndexMap::new();
        if !self.repeating_sections.is_empty() {
            let sections: Vec<String> = self.repeating_sections.iter().map(ToString::to_string).collect();
            props.insert("repeatingSections".to_string(), sections.join("|"));
        }
        if let Some(weight) = self.sort_weight {
            props.insert("sortWeight".to_string(), weight.to_string());
        }
        props
    }
}

/// `sheet:1,row:3,dataset:ART_INITIATIONS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepeatingSection {
    pub sheet: u32,
    pub row: u32,
    pub dataset: String,
}

impl RepeatingSection {
    pub fn new(sheet: u32, row: u32, dataset: impl Into<String>) -> Self {
        Self {
            sheet,
            row,
            dataset: dataset.into(),
        }
    }
}

impl fmt::Display for RepeatingSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet:{},row:{},dataset:{}", self.sheet, self.row, self.dataset)
    }
}

impl FromStr for RepeatingSection {
    type Err = ReportError;

    fn from_str(s: &str) -> ReportResult<Self> {
        repeating_section.parse(s).map_err(|e| {
            ReportError::invalid_design(format!(
                "repeating section must look like 'sheet:1,row:3,dataset:NAME', found '{s}' (offset {})",
                e.offset()
            ))
        })
    }
}

fn repeating_section(input: &mut &str) -> ModalResult<RepeatingSection> {
    let sheet = preceded(entry("sheet"), dec_uint).parse_next(input)?;
    let row = preceded((space0, ',', entry("row")), dec_uint).parse_next(input)?;
    let dataset = preceded(
        (space0, ',', entry("dataset")),
        terminated(
            take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
            space0,
        ),
    )
    .parse_next(input)?;
    Ok(RepeatingSection::new(sheet, row, dataset))
}

/// `key:` with optional surrounding spaces
fn entry<'a>(key: &'static str) -> impl Parser<&'a str, (), ErrMode<ContextError>> {
    (space0, key, space0, ':', space0).void()
}

impl TryFrom<String> for RepeatingSection {
    type Error = ReportError;

    fn try_from(s: String) -> ReportResult<Self> {
        s.parse()
    }
}

impl From<RepeatingSection> for String {
    fn from(section: RepeatingSection) -> Self {
        section.to_string()
    }
}

//! Display labels for the coded fields of a report.
//!
//! Categories and campus zones are stored as short codes. The tables here are
//! fixed, and any code they do not know is shown as-is so that listings and
//! search keep working when new codes show up before the tables catch up.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::model::{ReportKind, ReportStatus};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Category {
    Electronics,
    Accessories,
    Documents,
    Supplies,
    Clothing,
    Sports,
    Other,
}

impl Category {
    pub const fn label(self) -> &'static str {
        match self {
            Category::Electronics => "Electrónicos",
            Category::Accessories => "Accesorios",
            Category::Documents => "Documentos/Llaves",
            Category::Supplies => "Útiles Escolares",
            Category::Clothing => "Ropa/Calzado",
            Category::Sports => "Artículos Deportivos",
            Category::Other => "Otros",
        }
    }
}

/// Campus zones a report can be filed against.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Location {
    Biblioteca,
    Comedor,
    Canchas,
    Ing,
    Admin,
    Lab,
    Auditorio,
    Estacionamiento,
    Otro,
}

impl Location {
    pub const fn label(self) -> &'static str {
        match self {
            Location::Biblioteca => "Biblioteca Central",
            Location::Comedor => "Comedor Universitario",
            Location::Canchas => "Canchas Deportivas",
            Location::Ing => "Facultad de Ingeniería",
            Location::Admin => "Edificio Administrativo",
            Location::Lab => "Laboratorios",
            Location::Auditorio => "Auditorio",
            Location::Estacionamiento => "Estacionamiento",
            Location::Otro => "Otro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelDomain {
    Category,
    Location,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LabelResolver;

impl LabelResolver {
    /// Label for `code` in `domain`, or `code` itself when the table has no entry.
    pub fn resolve<'a>(&self, domain: LabelDomain, code: &'a str) -> &'a str {
        let known = match domain {
            LabelDomain::Category => code.parse::<Category>().ok().map(Category::label),
            LabelDomain::Location => code.parse::<Location>().ok().map(Location::label),
        };
        known.unwrap_or(code)
    }

    pub fn category<'a>(&self, code: &'a str) -> &'a str {
        self.resolve(LabelDomain::Category, code)
    }

    pub fn location<'a>(&self, code: &'a str) -> &'a str {
        self.resolve(LabelDomain::Location, code)
    }

    pub fn kind(&self, kind: ReportKind) -> &'static str {
        match kind {
            ReportKind::Lost => "Perdido",
            ReportKind::Found => "Encontrado",
        }
    }

    pub fn status(&self, status: ReportStatus) -> &'static str {
        match status {
            ReportStatus::Active => "Activo",
            ReportStatus::Matched => "Coincidencia",
            ReportStatus::Returned => "Entregado",
        }
    }
}

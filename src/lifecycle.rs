//! Report status machine.
//!
//! ```text
//! active --claim--> matched --confirm return--> returned
//! ```
//!
//! Nothing here mutates a report. Each legal transition produces a
//! [`TransitionRequest`] that the catalog commits as a write guarded on the
//! status the caller last saw, so concurrent claims resolve in storage.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

use crate::model::{ItemReport, ReportId, ReportKind, ReportStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Transition {
    Claim,
    ConfirmReturn,
    Reopen,
}

impl Transition {
    /// The transition that would move a report into `target`.
    pub fn toward(target: ReportStatus) -> Self {
        match target {
            ReportStatus::Active => Transition::Reopen,
            ReportStatus::Matched => Transition::Claim,
            ReportStatus::Returned => Transition::ConfirmReturn,
        }
    }

    pub fn target(self) -> ReportStatus {
        match self {
            Transition::Reopen => ReportStatus::Active,
            Transition::Claim => ReportStatus::Matched,
            Transition::ConfirmReturn => ReportStatus::Returned,
        }
    }

    /// The only status this transition may start from.
    pub fn source(self) -> Option<ReportStatus> {
        match self {
            Transition::Claim => Some(ReportStatus::Active),
            Transition::ConfirmReturn => Some(ReportStatus::Matched),
            Transition::Reopen => None,
        }
    }
}

/// Who is claiming: the person who found a lost item, or the owner of a
/// found one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ClaimantRole {
    Finder,
    Owner,
}

impl ClaimantRole {
    pub fn counterpart_of(kind: ReportKind) -> Self {
        match kind {
            ReportKind::Lost => ClaimantRole::Finder,
            ReportKind::Found => ClaimantRole::Owner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {attempted} a report that is {from}")]
    Illegal {
        from: ReportStatus,
        attempted: Transition,
    },
    #[error("a {role} cannot claim a {kind} report")]
    WrongClaimant { kind: ReportKind, role: ClaimantRole },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest {
    pub report_id: ReportId,
    pub transition: Transition,
    pub expected: ReportStatus,
    pub next: ReportStatus,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportStatusMachine;

impl ReportStatusMachine {
    pub fn claim(
        &self,
        report: &ItemReport,
        role: ClaimantRole,
    ) -> Result<TransitionRequest, TransitionError> {
        if role != ClaimantRole::counterpart_of(report.kind) {
            return Err(TransitionError::WrongClaimant {
                kind: report.kind,
                role,
            });
        }
        self.request(report, Transition::Claim)
    }

    pub fn confirm_return(&self, report: &ItemReport) -> Result<TransitionRequest, TransitionError> {
        self.request(report, Transition::ConfirmReturn)
    }

    /// Checks that `from -> to` is an edge of the machine.
    pub fn check_edge(
        &self,
        from: ReportStatus,
        to: ReportStatus,
    ) -> Result<Transition, TransitionError> {
        let transition = Transition::toward(to);
        if transition.source() == Some(from) {
            Ok(transition)
        } else {
            Err(TransitionError::Illegal {
                from,
                attempted: transition,
            })
        }
    }

    fn request(
        &self,
        report: &ItemReport,
        transition: Transition,
    ) -> Result<TransitionRequest, TransitionError> {
        let transition = self.check_edge(report.status, transition.target())?;
        Ok(TransitionRequest {
            report_id: report.id.clone(),
            transition,
            expected: report.status,
            next: transition.target(),
        })
    }
}

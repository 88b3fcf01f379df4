use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pipeline stage of a match. Declaration order is the pipeline display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    PendingProposal,
    Suggested,
    Applied,
    DocumentScreening,
    DocumentPassed,
    Interview,
    InterviewPassed,
    Offer,
    OfferAccepted,
    Rejected,
    Withdrawn,
}

impl MatchStatus {
    pub const ALL: [MatchStatus; 11] = [
        MatchStatus::PendingProposal,
        MatchStatus::Suggested,
        MatchStatus::Applied,
        MatchStatus::DocumentScreening,
        MatchStatus::DocumentPassed,
        MatchStatus::Interview,
        MatchStatus::InterviewPassed,
        MatchStatus::Offer,
        MatchStatus::OfferAccepted,
        MatchStatus::Rejected,
        MatchStatus::Withdrawn,
    ];

    /// Statuses reachable directly from `self`. Empty for terminal states.
    pub fn allowed_next(self) -> &'static [MatchStatus] {
        use MatchStatus::*;
        match self {
            PendingProposal => &[Suggested],
            Suggested => &[Applied, Offer, Rejected, Withdrawn],
            Applied => &[DocumentScreening, Offer, Rejected, Withdrawn],
            DocumentScreening => &[DocumentPassed, Offer, Rejected, Withdrawn],
            DocumentPassed => &[Interview, Offer, Rejected, Withdrawn],
            Interview => &[InterviewPassed, Offer, Rejected, Withdrawn],
            // re-entry for additional interview rounds
            InterviewPassed => &[Interview, Offer, Rejected, Withdrawn],
            Offer => &[OfferAccepted, Rejected, Withdrawn],
            OfferAccepted | Rejected | Withdrawn => &[],
        }
    }

    pub fn can_transition_to(self, to: MatchStatus) -> bool {
        self.allowed_next().contains(&to)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    /// Statuses a match may be created with.
    pub fn is_entry_point(self) -> bool {
        matches!(self, MatchStatus::PendingProposal | MatchStatus::Suggested)
    }

    /// Stages that record only their arrival time, never a business date.
    pub fn records_event_date(self) -> bool {
        self != MatchStatus::InterviewPassed
    }

    pub fn is_interview_stage(self) -> bool {
        matches!(self, MatchStatus::Interview | MatchStatus::InterviewPassed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::PendingProposal => "pending_proposal",
            MatchStatus::Suggested => "suggested",
            MatchStatus::Applied => "applied",
            MatchStatus::DocumentScreening => "document_screening",
            MatchStatus::DocumentPassed => "document_passed",
            MatchStatus::Interview => "interview",
            MatchStatus::InterviewPassed => "interview_passed",
            MatchStatus::Offer => "offer",
            MatchStatus::OfferAccepted => "offer_accepted",
            MatchStatus::Rejected => "rejected",
            MatchStatus::Withdrawn => "withdrawn",
        }
    }

    /// Display label shown to recruiters.
    pub fn label(self) -> &'static str {
        match self {
            MatchStatus::PendingProposal => "提案待ち",
            MatchStatus::Suggested => "提案済み",
            MatchStatus::Applied => "応募済み",
            MatchStatus::DocumentScreening => "書類選考中",
            MatchStatus::DocumentPassed => "書類選考通過（面接設定中）",
            MatchStatus::Interview => "面接",
            MatchStatus::InterviewPassed => "面接合格（次回面接設定中）",
            MatchStatus::Offer => "内定",
            MatchStatus::OfferAccepted => "内定承諾",
            MatchStatus::Rejected => "不合格",
            MatchStatus::Withdrawn => "辞退",
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown match status: {}", s))
    }
}

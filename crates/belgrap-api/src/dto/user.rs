//! User-facing DTOs: usage statistics and the referral overview

use belgrap_core::models::{ReferralInvite, ReferralMilestone, User};
use belgrap_services::referrals::ReferralOverview;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Usage statistics view
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub credits: i64,
    pub total_calls: i64,
    pub successful_calls: i64,
    pub total_seconds: i64,
    pub has_purchased: bool,
}

impl From<&User> for StatsResponse {
    fn from(user: &User) -> Self {
        Self {
            credits: user.credits,
            total_calls: user.total_calls,
            successful_calls: user.successful_calls,
            total_seconds: user.total_seconds,
            has_purchased: user.has_purchased,
        }
    }
}

/// One invite in the referral overview
#[derive(Debug, Clone, Serialize)]
pub struct InviteView {
    pub referred_email: String,
    pub credits_earned: i64,
    pub created_at: DateTime<Utc>,
    pub rewarded_at: Option<DateTime<Utc>>,
}

impl From<ReferralInvite> for InviteView {
    fn from(invite: ReferralInvite) -> Self {
        Self {
            referred_email: mask_email(&invite.referred_email),
            credits_earned: invite.credits_earned,
            created_at: invite.created_at,
            rewarded_at: invite.rewarded_at,
        }
    }
}

/// One achieved milestone in the referral overview
#[derive(Debug, Clone, Serialize)]
pub struct MilestoneView {
    pub threshold: i64,
    pub credits_awarded: i64,
    pub achieved_at: DateTime<Utc>,
}

impl From<ReferralMilestone> for MilestoneView {
    fn from(milestone: ReferralMilestone) -> Self {
        Self {
            threshold: milestone.threshold,
            credits_awarded: milestone.credits_awarded,
            achieved_at: milestone.achieved_at,
        }
    }
}

/// Referral overview response
#[derive(Debug, Clone, Serialize)]
pub struct ReferralsResponse {
    pub referral_code: Option<String>,
    pub invites: Vec<InviteView>,
    pub milestones: Vec<MilestoneView>,
    pub credits_earned: i64,
}

impl ReferralsResponse {
    /// Assemble the response from the service overview
    pub fn new(referral_code: Option<String>, overview: ReferralOverview) -> Self {
        Self {
            referral_code,
            invites: overview.invites.into_iter().map(Into::into).collect(),
            milestones: overview.milestones.into_iter().map(Into::into).collect(),
            credits_earned: overview.credits_earned,
        }
    }
}

/// Mask an email for display: `jan@example.nl` -> `j***@example.nl`
fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) => format!("{}***@{}", first, domain),
            None => "***".to_string(),
        },
        None => "***".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_from_user() {
        let user = User {
            credits: 3,
            total_calls: 10,
            successful_calls: 7,
            total_seconds: 450,
            ..Default::default()
        };

        let stats = StatsResponse::from(&user);
        assert_eq!(stats.credits, 3);
        assert_eq!(stats.successful_calls, 7);
    }

    #[test]
    fn test_mask_email() {
        assert_eq!(mask_email("jan@example.nl"), "j***@example.nl");
        assert_eq!(mask_email("a@b.c"), "a***@b.c");
        assert_eq!(mask_email("not-an-email"), "***");
    }
}

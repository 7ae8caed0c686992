use std::fmt;
use std::str::FromStr;

/// Every action the `?action=` selector understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Login,
    Logout,
    Register,
    AddRole,
    UpdateUser,
    GetCampaigns,
    CreateCampaign,
    UpdateCampaign,
    DeleteCampaign,
    UploadMedia,
    ManualAddScan,
    GetPartnerDashboard,
    GetInfluencerDashboard,
    SeedAnalytics,
}

impl Action {
    pub const ALL: [Action; 14] = [
        Action::Login,
        Action::Logout,
        Action::Register,
        Action::AddRole,
        Action::UpdateUser,
        Action::GetCampaigns,
        Action::CreateCampaign,
        Action::UpdateCampaign,
        Action::DeleteCampaign,
        Action::UploadMedia,
        Action::ManualAddScan,
        Action::GetPartnerDashboard,
        Action::GetInfluencerDashboard,
        Action::SeedAnalytics,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Login => "login",
            Action::Logout => "logout",
            Action::Register => "register",
            Action::AddRole => "add_role",
            Action::UpdateUser => "update_user",
            Action::GetCampaigns => "get_campaigns",
            Action::CreateCampaign => "create_campaign",
            Action::UpdateCampaign => "update_campaign",
            Action::DeleteCampaign => "delete_campaign",
            Action::UploadMedia => "upload_media",
            Action::ManualAddScan => "manual_add_scan",
            Action::GetPartnerDashboard => "get_partner_dashboard",
            Action::GetInfluencerDashboard => "get_influencer_dashboard",
            Action::SeedAnalytics => "seed_analytics",
        }
    }

    /// Actions that write state; these refuse `GET`.
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Action::GetCampaigns | Action::GetPartnerDashboard | Action::GetInfluencerDashboard
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

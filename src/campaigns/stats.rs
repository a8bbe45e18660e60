//! Cross-campaign summary metrics.

use serde::Serialize;

use super::model::Campaign;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignStats {
    pub total_campaigns: usize,
    pub emails_sent: u64,
    /// Percent of sent emails opened, one decimal place.
    pub open_rate: f64,
    /// Percent of sent emails clicked, one decimal place.
    pub click_rate: f64,
}

/// Reduce a set of campaigns to aggregate totals and rates.
pub fn summarize(campaigns: &[Campaign]) -> CampaignStats {
    let emails_sent: u64 = campaigns.iter().map(|c| u64::from(c.sent_count)).sum();
    let opens: u64 = campaigns.iter().map(|c| u64::from(c.open_count)).sum();
    let clicks: u64 = campaigns.iter().map(|c| u64::from(c.click_count)).sum();

    CampaignStats {
        total_campaigns: campaigns.len(),
        emails_sent,
        open_rate: rate(opens, emails_sent),
        click_rate: rate(clicks, emails_sent),
    }
}

fn rate(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let percent = count as f64 / total as f64 * 100.0;
    (percent * 10.0).round() / 10.0
}
